pub mod reassembler;

pub use reassembler::StreamReassembler;
