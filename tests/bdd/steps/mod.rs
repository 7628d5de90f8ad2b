//! Step definitions grouped by feature area.

mod api;
mod email;
mod placeholders;
