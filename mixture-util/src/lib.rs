pub mod clustering;
pub mod common_io;
pub mod dmatrix_io;
pub mod special_fn;
