use std::io;
use std::path::Path;

use clap::{Command, CommandFactory};
use clap_complete::{Shell, generate_to};

#[path = "src/cli.rs"]
mod cli;

// Packaging artifacts land under OUT_DIR/{man,completions}.
fn main() -> io::Result<()> {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let Some(out_dir) = std::env::var_os("OUT_DIR") else {
        return Err(io::Error::other("OUT_DIR not set"));
    };
    let out_dir = Path::new(&out_dir);

    let mut cmd = cli::Cli::command();

    let man_dir = out_dir.join("man");
    std::fs::create_dir_all(&man_dir)?;
    write_man_pages(&cmd, &man_dir, None)?;

    let completions_dir = out_dir.join("completions");
    std::fs::create_dir_all(&completions_dir)?;
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        generate_to(shell, &mut cmd, "spcctl", &completions_dir)?;
    }

    Ok(())
}

/// One page per visible command: `spcctl.1`, `spcctl-arm.1`, `spcctl-config-show.1`.
fn write_man_pages(cmd: &Command, dir: &Path, parent: Option<&str>) -> io::Result<()> {
    let page_name = match parent {
        Some(parent) => format!("{parent}-{}", cmd.get_name()),
        None => cmd.get_name().to_owned(),
    };

    let mut page = Vec::new();
    clap_mangen::Man::new(cmd.clone().name(page_name.clone())).render(&mut page)?;
    std::fs::write(dir.join(format!("{page_name}.1")), page)?;

    cmd.get_subcommands()
        .filter(|sub| !sub.is_hide_set())
        .try_for_each(|sub| write_man_pages(sub, dir, Some(&page_name)))
}
