use nalgebra::Vector3;
use tracing::{debug, trace};

use crate::config::PhysicsConfig;
use crate::dynamics::state::{BodyState, ThrusterCommand};
use crate::error::{Result, SimError};
use crate::sim::area::LandingZone;
use crate::sim::event::{ColliderKind, ContactEvent, StepReport, SurfaceKind};
use crate::sim::integrator::rk4_step;
use crate::vehicle::Capsule;

use super::PhysicsEngine;

// ---------------------------------------------------------------------------
// Sandbox engine: RK4 rigid body over a flat floor with penalty contacts
// ---------------------------------------------------------------------------

/// A contact point is touching when it is this close to the floor [m].
const CONTACT_EPS: f64 = 0.01;

/// Reference physics engine.
///
/// Integrates the capsule with `rk4_step`, then diffs each collider point's
/// floor contact against the previous step to produce begin/end events.
/// Points over the landing zone report `SurfaceKind::LandingZone`, anywhere
/// else `SurfaceKind::Ground`.
#[derive(Debug, Clone)]
pub struct SandboxEngine {
    physics: PhysicsConfig,
    landing_zone: LandingZone,
    body: Option<SpawnedBody>,
    command: ThrusterCommand,
}

#[derive(Debug, Clone)]
struct SpawnedBody {
    capsule: Capsule,
    state: BodyState,
    legs: Vec<Option<SurfaceKind>>,
    hull: Vec<Option<SurfaceKind>>,
    quiet_steps: u32,
}

impl SandboxEngine {
    pub fn new(physics: PhysicsConfig, landing_zone: LandingZone) -> Self {
        Self {
            physics,
            landing_zone,
            body: None,
            command: ThrusterCommand::default(),
        }
    }

    /// Current body state, if a vehicle is spawned.
    pub fn body(&self) -> Option<&BodyState> {
        self.body.as_ref().map(|b| &b.state)
    }

    fn surface_under(&self, point: &Vector3<f64>) -> SurfaceKind {
        if self.landing_zone.contains(point.x, point.y) {
            SurfaceKind::LandingZone
        } else {
            SurfaceKind::Ground
        }
    }
}

/// Diff one collider point's contact against its previous value, pushing events.
fn track_contact(
    previous: &mut Option<SurfaceKind>,
    now: Option<SurfaceKind>,
    collider: ColliderKind,
    impact_speed: f64,
    time: f64,
    events: &mut Vec<ContactEvent>,
) {
    match (*previous, now) {
        (None, Some(surface)) => {
            events.push(ContactEvent::begin(collider, surface, impact_speed).at(time));
        }
        (Some(surface), None) => {
            events.push(ContactEvent::end(collider, surface).at(time));
        }
        (Some(old), Some(new)) if old != new => {
            // Slid across the pad edge.
            events.push(ContactEvent::end(collider, old).at(time));
            events.push(ContactEvent::begin(collider, new, impact_speed).at(time));
        }
        _ => {}
    }
    *previous = now;
}

impl PhysicsEngine for SandboxEngine {
    fn spawn(&mut self, capsule: &Capsule, initial: BodyState) -> Result<()> {
        capsule.validate()?;
        debug!(
            capsule = %capsule.name,
            x = initial.pos.x,
            y = initial.pos.y,
            z = initial.pos.z,
            "spawn"
        );
        self.command = ThrusterCommand::idle(capsule.thruster_count());
        self.body = Some(SpawnedBody {
            capsule: capsule.clone(),
            state: initial,
            legs: vec![None; capsule.leg_count()],
            hull: vec![None; capsule.hull.len()],
            quiet_steps: 0,
        });
        Ok(())
    }

    fn despawn(&mut self) {
        if self.body.take().is_some() {
            debug!("despawn");
        }
    }

    fn is_spawned(&self) -> bool {
        self.body.is_some()
    }

    fn apply(&mut self, command: &ThrusterCommand) {
        self.command = command.clone();
    }

    fn step(&mut self, dt: f64) -> Result<StepReport> {
        let mut body = self.body.take().ok_or(SimError::NoVehicle)?;

        let next = rk4_step(&body.state, &body.capsule, &self.command, &self.physics, dt);
        let omega_world = next.omega_world();
        let mut contacts = Vec::new();

        for (idx, local) in body.capsule.legs.iter().enumerate() {
            let arm = next.quat * local;
            let point = next.pos + arm;
            let touching = (point.z <= CONTACT_EPS).then(|| self.surface_under(&point));
            let impact = (next.vel + omega_world.cross(&arm)).norm();
            track_contact(&mut body.legs[idx], touching, ColliderKind::Leg(idx), impact, next.time, &mut contacts);
        }
        for (idx, local) in body.capsule.hull.iter().enumerate() {
            let arm = next.quat * local;
            let point = next.pos + arm;
            let touching = (point.z <= CONTACT_EPS).then(|| self.surface_under(&point));
            let impact = (next.vel + omega_world.cross(&arm)).norm();
            track_contact(&mut body.hull[idx], touching, ColliderKind::Body, impact, next.time, &mut contacts);
        }

        if next.vel.norm() < self.physics.sleep_speed && next.omega.norm() < self.physics.sleep_rate {
            body.quiet_steps = body.quiet_steps.saturating_add(1);
        } else {
            body.quiet_steps = 0;
        }
        let at_rest = body.quiet_steps >= self.physics.sleep_steps;

        if !contacts.is_empty() {
            trace!(t = next.time, events = contacts.len(), "contacts");
        }

        body.state = next.clone();
        self.body = Some(body);

        Ok(StepReport { body: next, contacts, at_rest })
    }

    fn name(&self) -> &str {
        "sandbox"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::area::TrainingArea;
    use crate::sim::contact::{LandingContactTracker, LegContactState};
    use crate::sim::event::ContactPhase;
    use crate::vehicle::presets;
    use nalgebra::UnitQuaternion;

    fn engine() -> SandboxEngine {
        SandboxEngine::new(PhysicsConfig::default(), TrainingArea::standard(0).landing_zone)
    }

    fn run(engine: &mut SandboxEngine, steps: usize) -> Vec<StepReport> {
        (0..steps).map(|_| engine.step(0.02).unwrap()).collect()
    }

    #[test]
    fn step_without_vehicle_fails() {
        let mut e = engine();
        assert!(matches!(e.step(0.02), Err(SimError::NoVehicle)));
    }

    #[test]
    fn spawn_rejects_invalid_capsule() {
        let mut e = engine();
        let mut c = presets::capsule();
        c.mass = 0.0;
        assert!(e.spawn(&c, BodyState::at_rest(Vector3::new(0.0, 0.0, 10.0))).is_err());
        assert!(!e.is_spawned());
    }

    #[test]
    fn upright_drop_on_pad_touches_all_legs_on_landing_zone() {
        let mut e = engine();
        e.spawn(&presets::capsule(), BodyState::at_rest(Vector3::new(0.0, 0.0, 3.0))).unwrap();
        let reports = run(&mut e, 200);

        let begins: Vec<_> = reports.iter().flat_map(|r| r.collisions()).collect();
        let legs: Vec<_> = begins
            .iter()
            .filter(|c| matches!(c.collider, ColliderKind::Leg(_)))
            .collect();
        assert!(legs.len() >= 4);
        assert!(legs.iter().all(|c| c.surface == SurfaceKind::LandingZone));
        assert!(!begins.iter().any(|c| c.collider == ColliderKind::Body));
        assert!(reports.last().unwrap().at_rest, "capsule should settle");
    }

    #[test]
    fn touchdown_off_pad_reports_ground() {
        let mut e = engine();
        e.spawn(&presets::capsule(), BodyState::at_rest(Vector3::new(30.0, 0.0, 2.0))).unwrap();
        let reports = run(&mut e, 50);
        let first = reports.iter().flat_map(|r| r.collisions()).next().unwrap();
        assert_eq!(first.surface, SurfaceKind::Ground);
        assert!(first.relative_speed > 0.0);
    }

    #[test]
    fn upside_down_drop_hits_the_hull() {
        let mut e = engine();
        let mut s = BodyState::at_rest(Vector3::new(0.0, 0.0, 3.0));
        s.quat = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI);
        e.spawn(&presets::capsule(), s).unwrap();
        let reports = run(&mut e, 100);
        assert!(reports
            .iter()
            .flat_map(|r| r.collisions())
            .any(|c| c.collider == ColliderKind::Body));
    }

    #[test]
    fn lift_off_ends_contacts() {
        let mut e = engine();
        let c = presets::capsule();
        e.spawn(&c, BodyState::at_rest(Vector3::new(0.0, 0.0, 1.5))).unwrap();
        run(&mut e, 100);
        e.apply(&ThrusterCommand::from_flags(&[1, 0, 0, 0, 0]));
        let reports = run(&mut e, 100);
        let ends = reports
            .iter()
            .flat_map(|r| r.contacts.iter())
            .filter(|c| c.phase == ContactPhase::End && matches!(c.collider, ColliderKind::Leg(_)))
            .count();
        assert_eq!(ends, 4);
        assert!(!reports.last().unwrap().at_rest);
    }

    #[test]
    fn free_fall_is_never_at_rest() {
        let mut e = engine();
        e.spawn(&presets::capsule(), BodyState::at_rest(Vector3::new(0.0, 0.0, 500.0))).unwrap();
        assert!(run(&mut e, 20).iter().all(|r| !r.at_rest && r.contacts.is_empty()));
    }

    #[test]
    fn leg_sliding_onto_the_pad_ends_ground_before_begin_zone() {
        let physics = PhysicsConfig { contact_friction: 0.0, ..PhysicsConfig::default() };
        let mut e = SandboxEngine::new(physics, TrainingArea::standard(0).landing_zone);
        // Leg 1 (-1.6 m in x) starts 5 cm outside the pad edge at x = 5.
        let mut s = BodyState::at_rest(Vector3::new(6.65, 0.0, 1.5));
        s.vel = Vector3::new(-1.0, 0.0, 0.0);
        e.spawn(&presets::capsule(), s).unwrap();

        let mut tracker = LandingContactTracker::new(4);
        let mut crossed = false;
        for report in run(&mut e, 40) {
            let leg1: Vec<_> = report
                .contacts
                .iter()
                .filter(|c| c.collider == ColliderKind::Leg(1))
                .collect();
            if leg1.len() == 2 {
                assert_eq!(leg1[0].phase, ContactPhase::End);
                assert_eq!(leg1[0].surface, SurfaceKind::Ground);
                assert_eq!(leg1[1].phase, ContactPhase::Begin);
                assert_eq!(leg1[1].surface, SurfaceKind::LandingZone);
                crossed = true;
            }
            for c in &report.contacts {
                tracker.apply(c);
                let total: usize = LegContactState::ALL.iter().map(|st| tracker.count(*st)).sum();
                assert_eq!(total, 4);
            }
        }
        assert!(crossed, "leg 1 never crossed the pad edge");
        assert_eq!(tracker.leg_state(1), Some(LegContactState::OnLandingZone));
        assert_eq!(tracker.count(LegContactState::OnGround), 3);
    }

    #[test]
    fn despawn_is_idempotent() {
        let mut e = engine();
        e.spawn(&presets::capsule(), BodyState::at_rest(Vector3::new(0.0, 0.0, 5.0))).unwrap();
        e.despawn();
        e.despawn();
        assert!(!e.is_spawned());
        assert!(e.body().is_none());
    }
}
