//! Race order, overtakes and the results table

use super::car::Car;
use crate::format_time;

/// Sort cars into race order: furthest along the track (most negative Z)
/// first, ties broken by car id
pub fn sort_by_position(cars: &mut [Car]) {
    cars.sort_by(|a, b| a.pos.z.total_cmp(&b.pos.z).then(a.id.cmp(&b.id)));
}

/// Compare the player's position with last tick's and remember the new one
///
/// Returns true when the position changed and the player's speed differs from
/// the car now in its old place by more than the overtake threshold. Cars
/// must already be in race order.
pub fn detect_overtake(cars: &mut [Car]) -> bool {
    const OVERTAKE_SPEED_DIFFERENCE: f32 = 4.0;

    let Some(current) = cars.iter().position(|c| c.is_player()) else {
        return false;
    };
    let speed = cars[current].speed;
    let Some(previous) = cars[current].driver().map(|d| d.prev_position) else {
        return false;
    };
    if previous == current {
        return false;
    }
    if let Some(driver) = cars[current].driver_mut() {
        driver.prev_position = current;
    }
    cars.get(previous)
        .is_some_and(|other| (speed - other.speed).abs() > OVERTAKE_SPEED_DIFFERENCE)
}

/// One row of the results table
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    /// 1-based
    pub position: usize,
    pub car_id: u32,
    pub is_player: bool,
    pub lap: u32,
    pub race_time: f32,
    pub fastest_lap: Option<f32>,
}

impl Standing {
    pub fn fastest_lap_text(&self) -> String {
        self.fastest_lap.map(format_time).unwrap_or_else(|| "-".to_string())
    }
}

/// Results table in race order
pub fn standings(cars: &[Car]) -> Vec<Standing> {
    cars.iter()
        .enumerate()
        .map(|(i, car)| Standing {
            position: i + 1,
            car_id: car.id,
            is_player: car.is_player(),
            lap: car.laps.lap,
            race_time: car.laps.race_time,
            fastest_lap: car.laps.fastest_lap,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn cpu(id: u32, z: f32, speed: f32) -> Car {
        let mut rng = Pcg32::seed_from_u64(id as u64);
        let mut car = Car::new_cpu(id, Vec3::new(0.0, 0.0, z), 'c', 30.0, 50.0, &mut rng);
        car.speed = speed;
        car
    }

    fn player(z: f32, speed: f32, prev_position: usize) -> Car {
        let mut car = Car::new_player(0, Vec3::new(0.0, 0.0, z), 3);
        car.speed = speed;
        car.driver_mut().unwrap().prev_position = prev_position;
        car
    }

    #[test]
    fn test_sort_ties_by_id() {
        let mut cars = vec![cpu(3, -5.0, 0.0), cpu(1, -5.0, 0.0), cpu(2, -9.0, 0.0)];
        sort_by_position(&mut cars);
        let ids: Vec<u32> = cars.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_overtake_needs_speed_difference() {
        // Player moved from 2nd to 1st, passing a much slower car
        let mut cars = vec![player(-10.0, 60.0, 1), cpu(1, -9.0, 40.0)];
        assert!(detect_overtake(&mut cars));
        assert_eq!(cars[0].driver().unwrap().prev_position, 0);
        // Same position next tick: nothing
        assert!(!detect_overtake(&mut cars));

        // Position changed but speeds are close
        let mut cars = vec![player(-10.0, 42.0, 1), cpu(1, -9.0, 40.0)];
        assert!(!detect_overtake(&mut cars));
        assert_eq!(cars[0].driver().unwrap().prev_position, 0);
    }

    #[test]
    fn test_standings() {
        let mut cars = vec![cpu(1, -20.0, 0.0), player(-10.0, 0.0, 0)];
        cars[0].laps.fastest_lap = Some(65.5);
        let table = standings(&cars);
        assert_eq!(table[0].position, 1);
        assert_eq!(table[0].fastest_lap_text(), "1:05.500");
        assert!(table[1].is_player);
        assert_eq!(table[1].fastest_lap_text(), "-");
    }
}
