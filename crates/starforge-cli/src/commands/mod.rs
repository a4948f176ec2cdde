// Handlers behind the `starforge` binary. main.rs parses arguments and
// dispatches here.

pub mod render;
