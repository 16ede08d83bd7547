pub mod session_evictor;
