mod classifier;
mod common;
mod fetcher;
