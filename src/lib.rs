pub mod config;
pub mod count;
pub mod domain;
pub mod error;
pub mod exec;
pub mod fetch;
pub mod fs_util;
pub mod logging;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod reference;
pub mod workspace;
