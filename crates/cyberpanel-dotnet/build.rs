use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::Shell;

#[path = "src/cli.rs"]
mod cli;

const BIN_NAME: &str = "cyberpanel-dotnet";

/// Renders man pages and shell completions into `$OUT_DIR` for packaging.
fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let Some(out_dir) = std::env::var_os("OUT_DIR") else {
        panic!("OUT_DIR not set by Cargo");
    };
    if let Err(e) = generate_assets(Path::new(&out_dir)) {
        panic!("failed to generate man pages and completions: {e}");
    }
}

fn generate_assets(out_dir: &Path) -> io::Result<()> {
    let man_dir = out_dir.join("man");
    let completion_dir = out_dir.join("completions");
    std::fs::create_dir_all(&man_dir)?;
    std::fs::create_dir_all(&completion_dir)?;

    let mut cmd = cli::Cli::command();
    write_manpages(&cmd, &man_dir)?;
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        clap_complete::generate_to(shell, &mut cmd, BIN_NAME, &completion_dir)?;
    }
    Ok(())
}

/// `cyberpanel-dotnet.1` plus `cyberpanel-dotnet-<verb>.1` for each visible
/// subcommand, nested verbs included.
fn write_manpages(cmd: &clap::Command, dir: &Path) -> io::Result<()> {
    let name = cmd.get_name().to_owned();
    let mut page = Vec::new();
    clap_mangen::Man::new(cmd.clone()).render(&mut page)?;
    std::fs::write(dir.join(format!("{name}.1")), page)?;

    for sub in cmd.get_subcommands().filter(|sub| !sub.is_hide_set()) {
        let qualified = sub.clone().name(format!("{name}-{}", sub.get_name()));
        write_manpages(&qualified, dir)?;
    }
    Ok(())
}
