// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use profiles::{
    config::ProfilesConfig,
    merge_env_from_profiles,
    path::{default_config_file, default_database_dir},
    profile::{parse_env_list, qualified_name, split_qualified_name},
    default_merge_policies, EnvVars, MergePolicies, OsFileSystem, ProfileDatabase, Target,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::{fs::read_to_string, io::ErrorKind, path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  profiles [options] <profiles-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let session = Session::load(self.global)?;
        match self.command {
            Command::List(opts) => run_list(session, opts),
            Command::Add(opts) => run_add(session, opts),
            Command::Remove(opts) => run_remove(session, opts),
            Command::Env(opts) => run_env(session, opts),
        }
    }
}

#[derive(Debug, Clone, Args)]
struct GlobalOptions {
    /// Path to profile database file or directory.
    #[arg(long, global = true, value_name = "path")]
    pub db: Option<PathBuf>,

    /// Path to configuration file.
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List installed profiles.
    #[command(override_usage = "profiles list [options]")]
    List(ListOptions),

    /// Record new target of a profile.
    #[command(override_usage = "profiles add [options] <profile> --root <dir> --target <target>")]
    Add(AddOptions),

    /// Forget target of a profile.
    #[command(override_usage = "profiles remove [options] <profile> --target <target>")]
    Remove(RemoveOptions),

    /// Print merged environment of profiles.
    #[command(override_usage = "profiles env [options] <profile>...")]
    Env(EnvOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ListOptions {
    /// Show installed targets of each profile.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct AddOptions {
    /// Qualified name of profile, i.e., <installer>:<name>.
    #[arg(required = true, value_name = "profile")]
    pub profile: String,

    /// Root directory of profile.
    #[arg(short, long, value_name = "dir")]
    pub root: String,

    /// Target to record, i.e., <arch>-<os>@<version>.
    #[arg(short, long, value_name = "target")]
    pub target: Target,

    /// Environment variables of target, i.e., KEY=VALUE,...
    #[arg(short, long, value_name = "vars")]
    pub env: Option<String>,

    /// Directory target was installed into.
    #[arg(short, long, value_name = "dir")]
    pub installation_dir: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RemoveOptions {
    /// Qualified name of profile, i.e., <installer>:<name>.
    #[arg(required = true, value_name = "profile")]
    pub profile: String,

    /// Target to forget.
    #[arg(short, long, value_name = "target")]
    pub target: Target,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct EnvOptions {
    /// Qualified names of profiles to merge, in order.
    #[arg(required = true, value_name = "profile")]
    pub profiles: Vec<String>,

    /// Target to merge environments of, defaults to host target.
    #[arg(short, long, value_name = "target")]
    pub target: Option<Target>,

    /// Merge policies overriding configured policies.
    #[arg(short, long, value_name = "policies")]
    pub merge_policies: Option<MergePolicies>,
}

/// Resolved settings and loaded database.
struct Session {
    db: ProfileDatabase,
    db_path: PathBuf,
    config: ProfilesConfig,
}

impl Session {
    fn load(opts: GlobalOptions) -> Result<Self> {
        let config_path = match opts.config {
            Some(path) => path,
            None => default_config_file()?,
        };
        let config = match read_to_string(&config_path) {
            Ok(data) => data
                .parse::<ProfilesConfig>()
                .with_context(|| format!("invalid configuration {:?}", config_path.display()))?,
            Err(err) if err.kind() == ErrorKind::NotFound => ProfilesConfig::default(),
            Err(err) => return Err(err.into()),
        };

        let db_path = match (opts.db, &config.settings.database) {
            (Some(path), _) => path,
            (None, Some(path)) => path.as_path().to_path_buf(),
            (None, None) => default_database_dir()?,
        };

        let db = ProfileDatabase::new();
        db.read(&OsFileSystem, &db_path)?;

        Ok(Self {
            db,
            db_path,
            config,
        })
    }

    /// Split qualified profile name, falling back to configured installer.
    fn resolve<'a>(&'a self, qualified: &'a str) -> (&'a str, &'a str) {
        match (split_qualified_name(qualified), &self.config.settings.installer) {
            (("", name), Some(installer)) => (installer.as_str(), name),
            (split, _) => split,
        }
    }

    fn write(&self, installer: &str) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                mkdirp::mkdirp(parent)?;
            }
        }

        self.db.write(&OsFileSystem, installer, &self.db_path)?;
        Ok(())
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_list(session: Session, opts: ListOptions) -> Result<()> {
    for profile in session.db.profiles() {
        println!("{}", profile.qualified_name());
        if opts.verbose {
            for target in profile.targets() {
                println!("  {target} {}", target.installation_dir);
            }
        }
    }

    Ok(())
}

fn run_add(session: Session, opts: AddOptions) -> Result<()> {
    let (installer, name) = session.resolve(&opts.profile);
    if opts.target.version.is_empty() {
        bail!("target {} of {} must name a version", opts.target, opts.profile);
    }

    let mut target = opts.target;
    target.env = match opts.env {
        Some(vars) => parse_env_list(&vars)?,
        None => Vec::new(),
    };
    target.installation_dir = opts.installation_dir.unwrap_or_default();

    session.db.install_profile(installer, name, &opts.root);
    session.db.add_profile_target(installer, name, target.clone())?;
    session.write(installer)?;
    info!("add {target} to {}", opts.profile);

    Ok(())
}

fn run_remove(session: Session, opts: RemoveOptions) -> Result<()> {
    let (installer, name) = session.resolve(&opts.profile);
    if session.db.lookup_profile_target(installer, name, &opts.target).is_none() {
        bail!("profile {} has no target matching {}", opts.profile, opts.target);
    }

    if session.db.remove_profile_target(installer, name, &opts.target) {
        info!("remove profile {}", opts.profile);
    }
    session.write(installer)?;

    Ok(())
}

fn run_env(session: Session, opts: EnvOptions) -> Result<()> {
    let mut policies = session
        .config
        .settings
        .merge_policies
        .clone()
        .unwrap_or_else(default_merge_policies);
    if let Some(overrides) = opts.merge_policies {
        policies.extend(overrides);
    }

    let names = opts
        .profiles
        .iter()
        .map(|profile| {
            let (installer, name) = session.resolve(profile);
            qualified_name(installer, name)
        })
        .collect::<Vec<_>>();
    let target = opts.target.unwrap_or_else(Target::native);
    let mut env = EnvVars::from_process();
    merge_env_from_profiles(&policies, &mut env, &session.db, &names, &target);
    print!("{env}");

    Ok(())
}
