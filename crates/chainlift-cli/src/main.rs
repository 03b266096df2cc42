use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

mod catalogue;
mod completion;
mod dispatch;
mod render;

#[derive(Parser, Debug)]
#[command(name = "chainlift")]
#[command(about = "Chained framework major-version upgrades with checkpoints and rollback", long_about = None)]
struct Cli {
    #[arg(long)]
    project_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    plain: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Plan {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: String,
        #[arg(long, value_enum)]
        level: Option<LevelArg>,
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
    },
    Upgrade {
        #[arg(long)]
        to: String,
        #[arg(long, value_enum)]
        level: Option<LevelArg>,
        #[arg(long, value_enum)]
        checkpoint_frequency: Option<FrequencyArg>,
        #[arg(long, value_enum)]
        rollback_policy: Option<PolicyArg>,
        #[arg(long)]
        dry_run: bool,
    },
    Checkpoint {
        #[command(subcommand)]
        command: CheckpointCommands,
    },
    Rollback {
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        last_good: bool,
        #[arg(long)]
        progressive: bool,
        #[arg(long)]
        preserve: Vec<PathBuf>,
        #[arg(long)]
        backup: bool,
        #[arg(long)]
        validate_after: bool,
    },
    Doctor,
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum CheckpointCommands {
    List,
    Create {
        #[arg(long)]
        description: Option<String>,
    },
    Delete {
        id: String,
    },
    Cleanup {
        #[arg(long, default_value_t = 5)]
        keep: usize,
    },
    Validate {
        id: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum LevelArg {
    Basic,
    Standard,
    Comprehensive,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum StrategyArg {
    Conservative,
    Balanced,
    Progressive,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum FrequencyArg {
    EveryStep,
    MajorVersions,
    Disabled,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum PolicyArg {
    Automatic,
    Manual,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    dispatch::run_cli(cli)
}
