mod audio;
mod config;
mod coordinator;
mod error;
mod library;
mod mpris;
mod runtime;
mod view;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
