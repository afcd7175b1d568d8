mod cli;
mod config;
mod diagnostics;
mod pipeline;
mod preview;
mod transform;
mod watch;

#[cfg(test)]
mod test_files;

fn main() -> miette::Result<()> {
    cli::run()
}
