mod common;

mod disruptor_tests;
mod entry_stream_tests;
mod segment_tests;
