// The shell module is the interactive text interface.
// It only adapts stdin/stdout to the core services.

pub mod repl;
