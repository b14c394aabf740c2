// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::warn;

use stepseq::midi::{messages, print_ports, MidiOutput, MidirOutput};
use stepseq::project::Project;
use stepseq::timing::Clock;

fn print_usage() {
    println!("stepseq - MIDI step sequencer");
    println!();
    println!("Usage: stepseq [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --list-midi                    List available MIDI output ports");
    println!("  --test-note <N>                Send a test note to MIDI port N");
    println!("  --test-clock <N> [BPM]         Send MIDI clock to port N at BPM (default 120)");
    println!("  --play <FILE> <N> [SECONDS]    Play a project file on port N (default 30s)");
    println!("  --help                         Show this help message");
}

fn send_test_note(port: usize) -> Result<()> {
    println!("Connecting to MIDI port {}...", port);
    let mut output = MidirOutput::new(port)?;

    let channel = 0; // MIDI channel 1
    let note = 60; // Middle C
    let velocity = 100;

    println!("Sending test note (Middle C, velocity {})...", velocity);

    output.send(&[messages::NOTE_ON | channel, note, velocity])?;
    println!("Note On sent");

    thread::sleep(Duration::from_millis(500));

    output.send(&[messages::NOTE_OFF | channel, note, 0])?;
    println!("Note Off sent");

    println!("Test complete!");
    Ok(())
}

fn send_test_clock(port: usize, bpm: f64) -> Result<()> {
    println!("Connecting to MIDI port {}...", port);
    let mut output = MidirOutput::new(port)?;
    let mut clock = Clock::new(bpm);

    println!("Sending MIDI clock at {} BPM for 4 beats...", clock.bpm());
    println!(
        "PPQN: 24, Pulse interval: {:.2}ms",
        clock.pulse_interval() * 1000.0
    );

    output.send(&clock.start())?;
    println!("START sent");

    let started = Instant::now();
    let mut last_frame = Instant::now();
    let run_duration = Duration::from_secs_f64(60.0 / clock.bpm() * 4.0); // 4 beats

    while started.elapsed() < run_duration {
        let delta = last_frame.elapsed().as_secs_f64();
        last_frame = Instant::now();

        for _ in 0..clock.advance(delta) {
            output.send_realtime(messages::TIMING_CLOCK)?;
        }
        thread::sleep(Duration::from_millis(1));
    }

    output.send(&clock.stop())?;
    println!("STOP sent");

    println!("Clock test complete!");
    Ok(())
}

fn play_project(path: &str, port: usize, seconds: f64) -> Result<()> {
    println!("Loading project {}...", path);
    let project = Project::load(path)?;
    println!(
        "'{}': {} scene(s) at {} BPM",
        project.name,
        project.scenes.len(),
        project.bpm
    );

    println!("Connecting to MIDI port {}...", port);
    let output = MidirOutput::new(port)?;
    println!("Connected to '{}'", output.port_name());

    let mut sequencer = project.into_sequencer()?;
    sequencer.set_output(Box::new(output));
    sequencer.start()?;

    let started = Instant::now();
    let mut last_frame = Instant::now();
    let run_duration = Duration::from_secs_f64(seconds);

    while started.elapsed() < run_duration {
        let delta = last_frame.elapsed().as_secs_f64();
        last_frame = Instant::now();

        // A failed frame is logged, not fatal; the next frame continues.
        if let Err(e) = sequencer.update(delta) {
            warn!("update failed: {e:#}");
        }
        thread::sleep(Duration::from_millis(1));
    }

    // Always stop so nothing is left sounding.
    sequencer.stop();
    println!("Playback complete!");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("stepseq - MIDI step sequencer");
        println!("Run with --help for usage information");
        return Ok(());
    }

    match args[1].as_str() {
        "--list-midi" => {
            print_ports();
        }
        "--test-note" => {
            if args.len() < 3 {
                eprintln!("Error: --test-note requires a port number");
                eprintln!("Use --list-midi to see available ports");
                std::process::exit(1);
            }
            let port: usize = args[2]
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid port number: {}", args[2]))?;
            send_test_note(port)?;
        }
        "--test-clock" => {
            if args.len() < 3 {
                eprintln!("Error: --test-clock requires a port number");
                eprintln!("Use --list-midi to see available ports");
                std::process::exit(1);
            }
            let port: usize = args[2]
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid port number: {}", args[2]))?;
            let bpm: f64 = if args.len() >= 4 {
                args[3].parse().unwrap_or(120.0)
            } else {
                120.0
            };
            send_test_clock(port, bpm)?;
        }
        "--play" => {
            if args.len() < 4 {
                eprintln!("Error: --play requires a project file and a port number");
                eprintln!("Use --list-midi to see available ports");
                std::process::exit(1);
            }
            let port: usize = args[3]
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid port number: {}", args[3]))?;
            let seconds: f64 = if args.len() >= 5 {
                args[4].parse().unwrap_or(30.0)
            } else {
                30.0
            };
            play_project(&args[2], port, seconds)?;
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Unknown option: {}", args[1]);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
