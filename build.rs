#[cfg(unix)]
use clap::CommandFactory;
#[cfg(unix)]
use clap_complete::{
    generate_to,
    shells::{Bash, Fish, Zsh},
};

#[cfg(unix)]
#[allow(dead_code)]
mod duration {
    include!("src/duration.rs");
}

#[cfg(unix)]
include!("src/args.rs");

#[cfg(unix)]
fn generate_completions() {
    let out_dir = std::env::var("OUT_DIR").unwrap();
    let mut cmd = Args::command();
    generate_to(Bash, &mut cmd, "watchping", &out_dir).unwrap();
    generate_to(Fish, &mut cmd, "watchping", &out_dir).unwrap();
    generate_to(Zsh, &mut cmd, "watchping", &out_dir).unwrap();
}

fn main() {
    println!("cargo:rerun-if-changed=src/args.rs");
    println!("cargo:rerun-if-changed=src/duration.rs");
    #[cfg(unix)]
    generate_completions();
}
