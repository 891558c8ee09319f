pub mod utils;

mod synth;
