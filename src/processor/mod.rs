pub mod detector;
pub mod emitter;
