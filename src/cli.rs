use anyhow::{Result, anyhow};
use pico_args::Arguments;
use std::{env, path::PathBuf};

use swipedeck::config::DeckConfigState;
use swipedeck::gestures::{DragSample, GestureResolver};
use swipedeck::runtime::{self, pipeline, replay};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("list") => {
            let cfg = DeckConfigState::load_or_install_default()?;
            let profiles: Vec<String> = cfg
                .list_profiles()
                .into_iter()
                .map(|p| {
                    if p == cfg.active_name {
                        format!("{p} *")
                    } else {
                        p
                    }
                })
                .collect();
            print_response(&serde_json::json!({"profiles": profiles, "active": cfg.active_name}));
            Ok(())
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: swipedeck use <profile_name>"))?;
            let mut cfg = DeckConfigState::load_or_install_default()?;
            cfg.set_active(&name)?;
            print_response(&serde_json::json!({"active_profile": cfg.active_name}));
            Ok(())
        }

        Some("doctor") => {
            let cfg = DeckConfigState::load_or_install_default()?;
            print_response(&cfg.doctor_report());
            Ok(())
        }

        Some("resolve") => {
            // usage: swipedeck resolve <dx> <dy> [vx] [vy]
            let usage = || anyhow!("usage: swipedeck resolve <dx> <dy> [vx] [vy]");
            let dx: f32 = pargs.free_from_str().map_err(|_| usage())?;
            let dy: f32 = pargs.free_from_str().map_err(|_| usage())?;
            let vx: f32 = pargs.opt_free_from_str()?.unwrap_or(0.0);
            let vy: f32 = pargs.opt_free_from_str()?.unwrap_or(0.0);
            let cfg = DeckConfigState::load_or_install_default()?;
            let semantics = cfg.profile.semantics()?;
            let resolver = GestureResolver::from_settings(&cfg.profile.deck);
            let sample = DragSample::new(dx, dy, vx, vy);
            let direction = resolver.resolve_release(&sample);
            print_response(&serde_json::json!({
                "dragging": resolver.resolve(&sample),
                "release": direction,
                "flick": resolver.is_flick(&sample),
                "action": direction.map(|d| semantics.action(d)),
            }));
            Ok(())
        }

        Some("replay") => {
            let path: PathBuf = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: swipedeck replay <script.json>"))?;
            let cfg = DeckConfigState::load_or_install_default()?;
            let script = replay::Script::load(&path)?;
            let stats = replay::run_replay(&cfg.profile, &script, std::io::stdout())?;
            print_stats(&stats)?;
            Ok(())
        }

        Some("live") => {
            let items_path: Option<PathBuf> = pargs.opt_free_from_str()?;
            let items = match items_path {
                Some(p) => runtime::load_items(&p)?,
                None => runtime::demo_items(),
            };
            let cfg = DeckConfigState::load_or_install_default()?;
            let stats = pipeline::run_live(&cfg.profile, items)?;
            print_stats(&stats)?;
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!(
        r#"swipedeck — directional card-swipe engine

USAGE:
  swipedeck help [command]                Show general or command-specific help
  swipedeck list                          List profiles
  swipedeck use <name>                    Switch active profile
  swipedeck doctor                        Show config paths and touch devices
  swipedeck resolve <dx> <dy> [vx] [vy]   Resolve one drag sample
  swipedeck replay <script.json>          Replay a scripted gesture session
  swipedeck live [items.json]             Swipe cards on a touch device

TIPS:
  - Profiles: ~/.config/swipedeck/profiles
  - Active profile pointer: ~/.config/swipedeck/active
  - RUST_LOG=debug for per-gesture logging
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "list" => {
            println!("usage: swipedeck list\nLists available profiles; marks active with '*'.")
        }
        "use" => {
            println!("usage: swipedeck use <name>\nValidates <name> and makes it the active profile.")
        }
        "doctor" => println!(
            "usage: swipedeck doctor\nPrints config paths, active deck settings and detected touch devices."
        ),
        "resolve" => println!(
            "usage: swipedeck resolve <dx> <dy> [vx] [vy]\nShows the direction a drag sample resolves to while dragging and at release."
        ),
        "replay" => println!(
            "usage: swipedeck replay <script.json>\nReplays pointer events and prints swipe/press events and final stats as JSON lines."
        ),
        "live" => println!(
            "usage: swipedeck live [items.json]\nDrives the deck from a touch device until the stack is empty or ctrl-c."
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}

fn print_stats(stats: &swipedeck::interaction::StatsSnapshot) -> Result<()> {
    let mut line = serde_json::to_value(stats)?;
    if let Some(obj) = line.as_object_mut() {
        obj.insert("type".into(), "stats".into());
    }
    println!("{line}");
    Ok(())
}
