#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{bail, Context, Result};
use jiff::civil::Date;
use med_check::Profile;
use std::path::PathBuf;

#[derive(Debug, Default)]
struct Args {
    profile: Option<PathBuf>,
    date: Option<Date>,
    init: bool,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut args = Args::default();
        let mut it = std::env::args().skip(1);
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--date" => {
                    let value = it.next().context("--date needs a YYYY-MM-DD value")?;
                    args.date = Some(
                        value
                            .parse()
                            .with_context(|| format!("invalid date {value:?}"))?,
                    );
                }
                "--init" => args.init = true,
                "-h" | "--help" => {
                    println!("usage: med-check [PROFILE.ron] [--date YYYY-MM-DD] [--init]");
                    std::process::exit(0);
                }
                flag if flag.starts_with('-') => bail!("unknown option {flag}"),
                path => {
                    if args.profile.is_some() {
                        bail!("only one profile path may be given");
                    }
                    args.profile = Some(PathBuf::from(path));
                }
            }
        }
        Ok(args)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse()?;

    let profile = match &args.profile {
        Some(path) if args.init => {
            let profile = Profile::default();
            profile.save(path)?;
            profile
        }
        Some(path) if path.exists() => Profile::load(path)?,
        Some(path) => {
            log::info!("{} not found, using the default profile", path.display());
            Profile::default()
        }
        None if args.init => bail!("--init needs a profile path"),
        None => Profile::default(),
    };

    let date = match args.date {
        Some(date) => date,
        None => profile.today()?,
    };
    log::debug!("showing dashboard for {date} in {}", profile.timezone_name());
    print!("{}", profile.dashboard(date));
    Ok(())
}
