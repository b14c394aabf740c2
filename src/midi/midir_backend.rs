// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! midir backend for cross-platform MIDI output.
//!
//! This module provides a midir implementation of the `MidiOutput` trait,
//! allowing stepseq to send MIDI messages to external devices on Linux,
//! macOS and Windows.

use anyhow::{anyhow, Result};
use midir::{MidiOutput as MidirClient, MidiOutputConnection};

use super::MidiOutput;

/// midir-based MIDI output connected to a single port.
pub struct MidirOutput {
    connection: MidiOutputConnection,
    port_name: String,
}

impl MidirOutput {
    /// Create a new output connected to the specified port.
    ///
    /// # Arguments
    /// * `port_index` - Index of the port in the system's MIDI output list
    ///
    /// # Returns
    /// * `Ok(MidirOutput)` on success
    /// * `Err` if the client could not be created or the port is missing
    pub fn new(port_index: usize) -> Result<Self> {
        let client = MidirClient::new("stepseq")
            .map_err(|e| anyhow!("Failed to create MIDI client: {}", e))?;

        let ports = client.ports();
        let port = ports.get(port_index).ok_or_else(|| {
            anyhow!(
                "MIDI output port {} not found (only {} available)",
                port_index,
                ports.len()
            )
        })?;

        let port_name = client
            .port_name(port)
            .unwrap_or_else(|_| format!("port {}", port_index));

        let connection = client
            .connect(port, "stepseq-out")
            .map_err(|e| anyhow!("Failed to connect to '{}': {}", port_name, e))?;

        Ok(Self {
            connection,
            port_name,
        })
    }

    /// Create a new output connected to a port by name.
    ///
    /// # Arguments
    /// * `name` - Partial name to match against port names
    pub fn new_by_name(name: &str) -> Result<Self> {
        let ports = list_ports();
        let index = ports
            .iter()
            .position(|(_, n)| n.to_lowercase().contains(&name.to_lowercase()))
            .ok_or_else(|| anyhow!("No MIDI output port matching '{}' found", name))?;

        Self::new(ports[index].0)
    }

    /// Name of the connected port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl MidiOutput for MidirOutput {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.connection
            .send(message)
            .map_err(|e| anyhow!("Failed to send MIDI message: {}", e))
    }
}

/// List available MIDI output ports as (index, name) pairs.
pub fn list_ports() -> Vec<(usize, String)> {
    let Ok(client) = MidirClient::new("stepseq-enum") else {
        return Vec::new();
    };

    client
        .ports()
        .iter()
        .enumerate()
        .map(|(i, port)| {
            let name = client
                .port_name(port)
                .unwrap_or_else(|_| format!("port {}", i));
            (i, name)
        })
        .collect()
}

/// Print available MIDI output ports to stdout.
pub fn print_ports() {
    let ports = list_ports();
    if ports.is_empty() {
        println!("No MIDI output ports available");
        return;
    }

    println!("Available MIDI output ports:");
    for (index, name) in ports {
        println!("  [{}] {}", index, name);
    }
}
