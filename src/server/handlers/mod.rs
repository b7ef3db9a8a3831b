// handlers module - HTTP route handlers
// Contains handlers for workspace file operations

pub mod file;
