pub mod analysis;
pub mod annotations;
pub mod batch;
pub mod prep;
