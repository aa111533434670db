//! Collision detection and response between cars and against scenery
//!
//! X and Z are not on the same scale (a segment is 1 unit long, the road is
//! 3000 wide), so there is no distance calculation: the two axes are checked
//! against separate windows.

use super::car::{Car, ControlSource};
use super::track::Track;
use crate::consts::*;
use crate::sign;

/// How two cars touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    /// Alongside each other: pushed apart laterally
    SideSwipe,
    /// One car ran into the back of the other
    RearEnd,
}

/// A resolved car-car collision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub kind: ContactKind,
    /// Trailing car (for side swipes, the first car of the pair)
    pub rear_id: u32,
    pub front_id: u32,
}

/// Classify the overlap between two cars, if any
pub fn classify(a: &Car, b: &Car) -> Option<ContactKind> {
    let dx = a.pos.x - b.pos.x;
    let dz = a.pos.z - b.pos.z;
    if dx.abs() >= COLLIDE_HALF_WIDTH || dz.abs() >= COLLIDE_DISTANCE_Z {
        return None;
    }
    if dz.abs() < SIDE_SWIPE_DISTANCE_Z {
        Some(ContactKind::SideSwipe)
    } else {
        Some(ContactKind::RearEnd)
    }
}

/// Resolve a rear-end collision; `rear` has the greater Z (forward is -Z)
///
/// The rear car drops to the front car's speed less the penalty, the front
/// car gets at least that much more, and the pair is separated about their
/// midpoint by exactly `MIN_SEPARATION_Z`. Speeds never go negative, so a
/// car running into one slower than the penalty just stops.
pub fn resolve_rear_end(rear: &mut Car, front: &mut Car) {
    let front_speed = front.speed;
    rear.speed = (front_speed - REAR_END_PENALTY).max(0.0);
    front.speed = front_speed.max(rear.speed + REAR_END_PENALTY);
    if let ControlSource::Ai(autopilot) = &mut front.control {
        autopilot.target_speed = front.speed;
    }

    let midpoint = (rear.pos.z + front.pos.z) / 2.0;
    front.pos.z = midpoint - MIN_SEPARATION_Z / 2.0;
    rear.pos.z = front.pos.z + MIN_SEPARATION_Z;
}

/// Push two cars apart sideways. Cars at the same X are split by list order.
pub fn resolve_side_swipe(a: &mut Car, b: &mut Car) {
    let direction = match sign(a.pos.x - b.pos.x) {
        0 => 1.0,
        s => s as f32,
    };
    a.pos.x += direction * SIDE_SWIPE_PUSH;
    b.pos.x -= direction * SIDE_SWIPE_PUSH;
}

/// Check and resolve one pair
///
/// Which car is behind is decided by signed Z distance only, never by which
/// one the player drives.
pub fn resolve_pair(a: &mut Car, b: &mut Car) -> Option<Contact> {
    if a.is_crashed() || b.is_crashed() {
        return None;
    }
    let contact = match classify(a, b)? {
        ContactKind::SideSwipe => {
            resolve_side_swipe(a, b);
            Contact {
                kind: ContactKind::SideSwipe,
                rear_id: a.id,
                front_id: b.id,
            }
        }
        ContactKind::RearEnd => {
            let (rear, front) = if a.pos.z > b.pos.z { (a, b) } else { (b, a) };
            resolve_rear_end(rear, front);
            Contact {
                kind: ContactKind::RearEnd,
                rear_id: rear.id,
                front_id: front.id,
            }
        }
    };
    Some(contact)
}

/// Resolve every overlapping pair, in list order
pub fn resolve_car_collisions(cars: &mut [Car]) -> Vec<Contact> {
    let mut contacts = Vec::new();
    for j in 1..cars.len() {
        let (head, tail) = cars.split_at_mut(j);
        let b = &mut tail[0];
        for a in head.iter_mut() {
            if let Some(contact) = resolve_pair(a, b) {
                contacts.push(contact);
            }
        }
    }
    contacts
}

/// Does lateral position `x` hit scenery attached to segment `index`?
pub fn scenery_hit(track: &Track, index: usize, x: f32) -> bool {
    track
        .get(index)
        .is_some_and(|segment| segment.scenery.iter().any(|s| s.collides_at(x)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::track::{Scenery, TrackSegment};
    use glam::Vec3;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn car_at(id: u32, x: f32, z: f32, speed: f32) -> Car {
        let mut rng = Pcg32::seed_from_u64(id as u64);
        let mut car = Car::new_cpu(id, Vec3::new(x, 0.0, z), 'b', 30.0, 50.0, &mut rng);
        car.speed = speed;
        car
    }

    #[test]
    fn test_rear_end_separation() {
        let mut rear = car_at(1, 0.0, -10.0, 60.0);
        let mut front = car_at(2, 0.0, -10.5, 40.0);
        let contact = resolve_pair(&mut rear, &mut front).unwrap();
        assert_eq!(contact.kind, ContactKind::RearEnd);
        assert_eq!(contact.rear_id, 1);
        assert!(((rear.pos.z - front.pos.z) - MIN_SEPARATION_Z).abs() < 1e-5);
        assert!(front.pos.z < rear.pos.z);
        assert_eq!(rear.speed, 37.0);
        assert_eq!(front.speed, 40.0);
        assert_eq!(front.autopilot().unwrap().target_speed, 40.0);
        // Separated pair no longer overlaps
        assert_eq!(classify(&rear, &front), None);
    }

    #[test]
    fn test_rear_end_into_slow_car_stops() {
        let mut rear = car_at(1, 0.0, -10.0, 20.0);
        let mut front = car_at(2, 0.0, -10.3, 1.0);
        resolve_pair(&mut rear, &mut front).unwrap();
        assert_eq!(rear.speed, 0.0);
        assert_eq!(front.speed, REAR_END_PENALTY);
    }

    #[test]
    fn test_rear_end_decided_by_position_not_player() {
        let mut player = Car::new_player(0, Vec3::new(0.0, 0.0, -20.3), 2);
        player.speed = 30.0;
        let mut cpu = car_at(1, 50.0, -20.0, 70.0);
        let contact = resolve_pair(&mut player, &mut cpu).unwrap();
        // CPU car is behind (greater Z) and ran into the player
        assert_eq!(contact.rear_id, 1);
        assert_eq!(cpu.speed, 27.0);
        assert_eq!(player.speed, 30.0);
    }

    #[test]
    fn test_side_swipe_pushes_apart() {
        let mut a = car_at(1, 100.0, -5.0, 50.0);
        let mut b = car_at(2, 0.0, -5.1, 50.0);
        let contact = resolve_pair(&mut a, &mut b).unwrap();
        assert_eq!(contact.kind, ContactKind::SideSwipe);
        assert_eq!(a.pos.x, 150.0);
        assert_eq!(b.pos.x, -50.0);
        assert_eq!(a.speed, 50.0);

        // Identical X: split by list order
        let mut a = car_at(1, 0.0, -5.0, 50.0);
        let mut b = car_at(2, 0.0, -5.0, 50.0);
        resolve_pair(&mut a, &mut b);
        assert_eq!(a.pos.x, SIDE_SWIPE_PUSH);
        assert_eq!(b.pos.x, -SIDE_SWIPE_PUSH);
    }

    #[test]
    fn test_no_contact_outside_window() {
        let a = car_at(1, 0.0, -5.0, 50.0);
        assert_eq!(classify(&a, &car_at(2, 300.0, -5.0, 50.0)), None);
        assert_eq!(classify(&a, &car_at(2, 0.0, -5.7, 50.0)), None);
    }

    #[test]
    fn test_crashed_cars_pass_through() {
        let mut a = car_at(1, 0.0, -5.0, 50.0);
        let mut b = car_at(2, 0.0, -5.3, 50.0);
        b.crash(true);
        assert_eq!(resolve_pair(&mut a, &mut b), None);
    }

    #[test]
    fn test_resolve_all_pairs() {
        let mut cars = vec![
            car_at(1, 0.0, -10.0, 60.0),
            car_at(2, 2000.0, -10.0, 60.0),
            car_at(3, 0.0, -10.4, 40.0),
        ];
        let contacts = resolve_car_collisions(&mut cars);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].rear_id, 1);
        assert_eq!(contacts[0].front_id, 3);
    }

    #[test]
    fn test_scenery_hit() {
        let mut segment = TrackSegment::default();
        segment.scenery.push(Scenery::lamp_right(VIEW_DISTANCE));
        let track = Track::new(vec![TrackSegment::default(), segment]);
        assert!(scenery_hit(&track, 1, -LAMP_X - 500.0));
        assert!(!scenery_hit(&track, 1, 0.0));
        assert!(!scenery_hit(&track, 0, -LAMP_X - 500.0));
        assert!(!scenery_hit(&track, 99, -LAMP_X - 500.0));
    }

    proptest! {
        #[test]
        fn prop_rear_speed_bounded_by_front(
            rear_speed in 0.0f32..150.0,
            front_speed in 0.0f32..150.0,
            gap in 0.2f32..0.59,
            dx in -259.0f32..259.0,
        ) {
            let mut rear = car_at(1, dx, -10.0, rear_speed);
            let mut front = car_at(2, 0.0, -10.0 - gap, front_speed);
            let contact = resolve_pair(&mut rear, &mut front);
            prop_assert!(contact.is_some());
            prop_assert!(rear.speed <= (front_speed - REAR_END_PENALTY).max(0.0));
            prop_assert!(front.speed >= front_speed);
            prop_assert!(((rear.pos.z - front.pos.z) - MIN_SEPARATION_Z).abs() < 1e-4);
        }
    }
}
