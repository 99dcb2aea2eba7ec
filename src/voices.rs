//! # Voice/System Segmentation
//!
//! Regroups a tune body's flat element list into systems.
//!
//! ## Rules
//! - With fewer than two voices, every physical line (its elements plus the
//!   end-of-line or section-break token closing it) is one system.
//! - With two or more voices, lines before the first voice marker are still
//!   split one per system. From the first marker on, only markers open
//!   systems: a marker continues the current system when it sits on the same
//!   physical line as the previous marker and its voice comes later in the
//!   voice order. Any other marker starts a new system.
//!
//! `V:` lines and `[V:...]` inline fields are both voice markers.
//!
//! A standalone `V:` line always begins its own physical line, so it always
//! opens a new system. A score written as alternating `V:1` / `V:2` lines
//! therefore gets one system per voice line; only inline `[V:...]` markers
//! sharing a line are grouped into one system.
//!
//! ## Example
//! ```text
//! voices: [1, 2]
//!
//! V:1        system 1
//! V:2        system 2
//! V:1        system 3
//! CDEF|
//! V:2        system 4
//! GABC|
//! ```

use std::mem;

use crate::ast::{Element, System};

/// Split `elements` into systems. `voices` is the tune's voice order.
pub fn segment(elements: Vec<Element>, voices: &[String]) -> Vec<System> {
    if voices.len() < 2 {
        return split_lines(elements);
    }

    let mut systems = Vec::new();
    let mut current: System = Vec::new();
    let mut last_voice: Option<usize> = None;
    let mut new_line = true;

    for element in elements {
        let marker = element
            .voice_id()
            .map(|id| voices.iter().position(|v| v == id).unwrap_or(voices.len()));
        match marker {
            Some(index) => {
                let continues = !new_line && last_voice.is_some_and(|last| index > last);
                if !continues && !current.is_empty() {
                    systems.push(mem::take(&mut current));
                }
                last_voice = Some(index);
                new_line = false;
                current.push(element);
            }
            None => {
                let line_end = element.is_line_end();
                current.push(element);
                if line_end {
                    new_line = true;
                    if last_voice.is_none() {
                        systems.push(mem::take(&mut current));
                    }
                }
            }
        }
    }
    if !current.is_empty() {
        systems.push(current);
    }
    log::trace!("segmented {} voices into {} systems", voices.len(), systems.len());
    systems
}

fn split_lines(elements: Vec<Element>) -> Vec<System> {
    let mut systems = Vec::new();
    let mut current = Vec::new();
    for element in elements {
        let line_end = element.is_line_end();
        current.push(element);
        if line_end {
            systems.push(mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        systems.push(current);
    }
    systems
}
