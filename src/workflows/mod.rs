pub mod adjudication;
