//! Operator commands and the status report.

use std::collections::VecDeque;
use std::fmt;

use bevy_ecs::prelude::Resource;

use crate::ecs::{RideId, VehicleId};
use crate::geo::{bearing_deg, compass_point, distance_m, Coordinate};
use crate::ride::{RideContext, RidePhase};

pub const HELP_TEXT: &str = "commands: ACCEPT, REJECT, PICKUP, COMPLETE, STATUS, HELP";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Accept,
    Reject,
    Pickup,
    Complete,
    Status,
    Help,
}

impl Command {
    /// Parses one console line. Case-insensitive; unknown input yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_uppercase().as_str() {
            "ACCEPT" => Some(Command::Accept),
            "REJECT" => Some(Command::Reject),
            "PICKUP" => Some(Command::Pickup),
            "COMPLETE" => Some(Command::Complete),
            "STATUS" => Some(Command::Status),
            "HELP" => Some(Command::Help),
            _ => None,
        }
    }
}

/// Commands queued by the console, consumed one per tick.
#[derive(Debug, Default, Resource)]
pub struct PendingCommands(pub VecDeque<Command>);

impl PendingCommands {
    pub fn push(&mut self, command: Command) {
        self.0.push_back(command);
    }

    pub fn pop(&mut self) -> Option<Command> {
        self.0.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Points the operator can expect if the ride were completed here.
pub fn drop_points_estimate(distance_m: f64) -> &'static str {
    if distance_m <= 50.0 {
        "8-10"
    } else if distance_m <= 100.0 {
        "5-8"
    } else {
        "Review"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetReport {
    pub name: &'static str,
    pub distance_m: f64,
    pub heading: &'static str,
    pub drop_estimate: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub vehicle: VehicleId,
    pub position: Coordinate,
    pub points: u32,
    pub phase: RidePhase,
    pub ride_id: Option<RideId>,
    pub target: Option<TargetReport>,
    pub rides_completed: usize,
}

impl StatusReport {
    pub fn capture(
        vehicle: VehicleId,
        position: Coordinate,
        points: u32,
        ride: &RideContext,
        rides_completed: usize,
    ) -> Self {
        let phase = ride.phase();
        let target = ride.target().map(|wp| {
            let distance = distance_m(position, wp.position);
            TargetReport {
                name: wp.name,
                distance_m: distance,
                heading: compass_point(bearing_deg(position, wp.position)),
                drop_estimate: (phase == RidePhase::ToDestination).then(|| drop_points_estimate(distance)),
            }
        });
        Self {
            vehicle,
            position,
            points,
            phase,
            ride_id: ride.ride_id().cloned(),
            target,
            rides_completed,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} | {} points | {} rides | {}",
            self.vehicle, self.position, self.points, self.rides_completed, self.phase
        )?;
        if let Some(id) = &self.ride_id {
            write!(f, " ride {id}")?;
        }
        if let Some(target) = &self.target {
            write!(
                f,
                " -> {} {:.0} m {}",
                target.name, target.distance_m, target.heading
            )?;
            if let Some(estimate) = target.drop_estimate {
                write!(f, " (drop est. {estimate} points)")?;
            }
        }
        Ok(())
    }
}
