pub mod compute_index;
