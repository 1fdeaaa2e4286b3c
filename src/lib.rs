pub mod app;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod invoker;
pub mod output;
pub mod parser;
pub mod runner;
pub mod tasks;
pub mod transform;
pub mod wordlist;

#[cfg(test)]
mod tests;
