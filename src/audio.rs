//! Sound effects driven by race events
//!
//! The simulation only raises `RaceEvent`s; this module maps them to named
//! sound effects and hands them to a `SoundTrigger` backend, fire-and-forget.
//! Effects with several recorded variants rotate through them. The player's
//! engine and tyre skid are looping sounds updated once per tick.

use crate::remap_clamp;
use crate::sim::state::{RaceEvent, RaceState};
use crate::sim::tick::TickInput;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Countdown second passed
    StartBeep,
    /// Lights out
    GoBeep,
    /// Player hit a car ahead or alongside
    Bump,
    /// Player was hit from behind
    BumpBehind,
    /// Player hit scenery
    Explosion,
    /// Player passed or was passed
    Overtake,
    /// New fastest lap
    FastLap,
    FinalLap,
    HitGrass,
    /// Player finished the race
    GameComplete,
}

impl SoundEffect {
    pub const ALL: [SoundEffect; 10] = [
        SoundEffect::StartBeep,
        SoundEffect::GoBeep,
        SoundEffect::Bump,
        SoundEffect::BumpBehind,
        SoundEffect::Explosion,
        SoundEffect::Overtake,
        SoundEffect::FastLap,
        SoundEffect::FinalLap,
        SoundEffect::HitGrass,
        SoundEffect::GameComplete,
    ];

    /// Base name of the sound files
    pub fn name(&self) -> &'static str {
        match self {
            SoundEffect::StartBeep => "startbeep",
            SoundEffect::GoBeep => "gobeep",
            SoundEffect::Bump => "bump",
            SoundEffect::BumpBehind => "bump_behind",
            SoundEffect::Explosion => "explosion",
            SoundEffect::Overtake => "overtake",
            SoundEffect::FastLap => "fastlap",
            SoundEffect::FinalLap => "final_lap",
            SoundEffect::HitGrass => "hit_grass",
            SoundEffect::GameComplete => "game_complete",
        }
    }

    /// Number of recorded variants
    pub fn variants(&self) -> u32 {
        match self {
            SoundEffect::Bump | SoundEffect::Overtake => 6,
            _ => 1,
        }
    }

    /// File name of one variant, e.g. `bump3`
    pub fn file_name(&self, variant: u32) -> String {
        format!("{}{}", self.name(), variant)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// The effect to play for a race event, if any
pub fn sound_for_event(event: &RaceEvent) -> Option<SoundEffect> {
    match event {
        RaceEvent::CountdownBeep => Some(SoundEffect::StartBeep),
        RaceEvent::Go => Some(SoundEffect::GoBeep),
        RaceEvent::Bump => Some(SoundEffect::Bump),
        RaceEvent::BumpBehind => Some(SoundEffect::BumpBehind),
        RaceEvent::Explosion => Some(SoundEffect::Explosion),
        RaceEvent::Overtake => Some(SoundEffect::Overtake),
        RaceEvent::FastestLap => Some(SoundEffect::FastLap),
        RaceEvent::FinalLap => Some(SoundEffect::FinalLap),
        RaceEvent::HitGrass => Some(SoundEffect::HitGrass),
        RaceEvent::RaceComplete => Some(SoundEffect::GameComplete),
        RaceEvent::LapComplete { .. } | RaceEvent::TimeUp => None,
    }
}

/// Number of engine loops, ordered by pitch
pub const ENGINE_SOUND_COUNT: usize = 40;
pub const ENGINE_VOLUME: f32 = 0.3;

/// Sounds that loop until stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopSound {
    /// Engine loop for one pitch band
    Engine(usize),
    Skid,
}

impl LoopSound {
    pub fn file_name(&self) -> String {
        match self {
            LoopSound::Engine(index) => format!("engine_short{}", index),
            LoopSound::Skid => "skid_loop0".to_string(),
        }
    }
}

/// Audio backend
pub trait SoundTrigger {
    /// Start playing one variant of an effect; must not block
    fn play(&mut self, effect: SoundEffect, variant: u32, volume: f32);

    /// Start a looping sound or change its volume; volume 0 stops it
    fn set_loop(&mut self, sound: LoopSound, volume: f32);
}

/// Backend that only logs, for headless runs
#[derive(Debug, Default)]
pub struct LogSoundTrigger;

impl SoundTrigger for LogSoundTrigger {
    fn play(&mut self, effect: SoundEffect, variant: u32, volume: f32) {
        log::debug!("Sound: {} (volume {:.2})", effect.file_name(variant), volume);
    }

    fn set_loop(&mut self, sound: LoopSound, volume: f32) {
        if volume > 0.0 {
            log::trace!("Loop: {} (volume {:.2})", sound.file_name(), volume);
        } else {
            log::trace!("Loop stopped: {}", sound.file_name());
        }
    }
}

/// What the player's car is doing, for the looping sounds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CarSound {
    pub speed: f32,
    pub grip: f32,
    /// Steering input is non-zero
    pub steering: bool,
    /// Crashed or being put back on the track
    pub resetting: bool,
    /// X offset of the segment ahead
    pub curvature: f32,
}

impl CarSound {
    /// Sample the player's car after a tick; `None` in demo mode
    pub fn from_state(state: &RaceState, input: &TickInput) -> Option<Self> {
        let car = state.player()?;
        let driver = car.driver()?;
        let curvature = state
            .track
            .first_ahead(car.pos.z)
            .and_then(|(index, _)| state.track.get(index))
            .map(|segment| segment.dx)
            .unwrap_or(0.0);
        Some(Self {
            speed: car.speed,
            grip: driver.grip,
            steering: input.steer != 0.0,
            resetting: car.is_crashed(),
            curvature,
        })
    }
}

/// Audio manager for the game
pub struct AudioManager<T: SoundTrigger> {
    trigger: T,
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
    next_variant: [u32; SoundEffect::ALL.len()],
    /// Engine loop currently playing
    engine_loop: Option<usize>,
    skid_volume: f32,
}

impl<T: SoundTrigger> AudioManager<T> {
    pub fn new(trigger: T) -> Self {
        Self {
            trigger,
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            next_variant: [0; SoundEffect::ALL.len()],
            engine_loop: None,
            skid_volume: 0.0,
        }
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if muted {
            self.stop_loops();
        }
    }

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    pub fn trigger(&self) -> &T {
        &self.trigger
    }

    /// Play a sound effect
    pub fn play(&mut self, effect: SoundEffect) {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }
        let slot = &mut self.next_variant[effect.index()];
        let variant = *slot;
        *slot = (variant + 1) % effect.variants();
        self.trigger.play(effect, variant, vol);
    }

    /// Play the sounds for a batch of race events, in order
    pub fn dispatch(&mut self, events: &[RaceEvent]) {
        for effect in events.iter().filter_map(sound_for_event) {
            self.play(effect);
        }
    }

    /// Update the engine and skid loops; `None` (no player car) stops them
    ///
    /// The backend is only told about changes.
    pub fn update_loops(&mut self, car: Option<&CarSound>) {
        let vol = self.effective_volume();
        let Some(car) = car.filter(|_| vol > 0.0) else {
            self.stop_loops();
            return;
        };

        let engine = engine_sound_index(car.speed, ENGINE_SOUND_COUNT);
        if self.engine_loop != Some(engine) {
            if let Some(old) = self.engine_loop {
                self.trigger.set_loop(LoopSound::Engine(old), 0.0);
            }
            self.trigger.set_loop(LoopSound::Engine(engine), ENGINE_VOLUME * vol);
            self.engine_loop = Some(engine);
        }

        let skid = skid_volume(car.grip, car.steering, car.resetting, car.curvature) * vol;
        if skid != self.skid_volume {
            self.trigger.set_loop(LoopSound::Skid, skid);
            self.skid_volume = skid;
        }
    }

    fn stop_loops(&mut self) {
        if let Some(old) = self.engine_loop.take() {
            self.trigger.set_loop(LoopSound::Engine(old), 0.0);
        }
        if self.skid_volume > 0.0 {
            self.trigger.set_loop(LoopSound::Skid, 0.0);
            self.skid_volume = 0.0;
        }
    }
}

/// Grip below which tyres start to squeal
pub const SKID_SOUND_START_GRIP: f32 = 0.8;

/// Volume of the looping skid sound
///
/// Silent unless the player is steering with reduced grip; louder as grip
/// falls and on tighter corners (`curvature` is the X offset of the segment
/// ahead).
pub fn skid_volume(grip: f32, steering: bool, resetting: bool, curvature: f32) -> f32 {
    if resetting || !steering || grip >= SKID_SOUND_START_GRIP {
        return 0.0;
    }
    remap_clamp(grip, SKID_SOUND_START_GRIP, 0.5, 0.0, 1.0) * remap_clamp(curvature.abs(), 0.0, 15.0, 0.0, 1.0)
}

/// Which of `count` engine loops (ordered by pitch) matches `speed`
pub fn engine_sound_index(speed: f32, count: usize) -> usize {
    ((speed.max(0.0) * 0.6) as usize).min(count.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<(SoundEffect, u32)>, Vec<(LoopSound, f32)>);

    impl SoundTrigger for Recorder {
        fn play(&mut self, effect: SoundEffect, variant: u32, _volume: f32) {
            self.0.push((effect, variant));
        }

        fn set_loop(&mut self, sound: LoopSound, volume: f32) {
            self.1.push((sound, volume));
        }
    }

    #[test]
    fn test_effect_indices_match_table() {
        for (i, effect) in SoundEffect::ALL.iter().enumerate() {
            assert_eq!(effect.index(), i);
        }
    }

    #[test]
    fn test_dispatch_maps_events() {
        let mut audio = AudioManager::new(Recorder::default());
        audio.dispatch(&[
            RaceEvent::CountdownBeep,
            RaceEvent::LapComplete { lap: 2, time: 61.0 },
            RaceEvent::FastestLap,
            RaceEvent::TimeUp,
        ]);
        assert_eq!(
            audio.trigger().0,
            vec![(SoundEffect::StartBeep, 0), (SoundEffect::FastLap, 0)]
        );
    }

    #[test]
    fn test_variants_rotate() {
        let mut audio = AudioManager::new(Recorder::default());
        for _ in 0..7 {
            audio.play(SoundEffect::Bump);
        }
        audio.play(SoundEffect::Explosion);
        audio.play(SoundEffect::Explosion);
        let variants: Vec<u32> = audio.trigger().0.iter().map(|&(_, v)| v).collect();
        assert_eq!(variants, vec![0, 1, 2, 3, 4, 5, 0, 0, 0]);
        assert_eq!(SoundEffect::Bump.file_name(3), "bump3");
    }

    #[test]
    fn test_muted_plays_nothing() {
        let mut audio = AudioManager::new(Recorder::default());
        audio.set_muted(true);
        audio.dispatch(&[RaceEvent::Go, RaceEvent::Explosion]);
        assert!(audio.trigger().0.is_empty());
    }

    #[test]
    fn test_skid_volume() {
        assert_eq!(skid_volume(1.0, true, false, 15.0), 0.0);
        assert_eq!(skid_volume(0.3, false, false, 15.0), 0.0);
        assert_eq!(skid_volume(0.3, true, true, 15.0), 0.0);
        assert_eq!(skid_volume(0.3, true, false, 15.0), 1.0);
        assert_eq!(skid_volume(0.3, true, false, 0.0), 0.0);
        assert!((skid_volume(0.65, true, false, -30.0) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_engine_sound_index() {
        assert_eq!(engine_sound_index(0.0, 40), 0);
        assert_eq!(engine_sound_index(50.0, 40), 30);
        assert_eq!(engine_sound_index(100.0, 40), 39);
        assert_eq!(engine_sound_index(10.0, 0), 0);
    }

    #[test]
    fn test_engine_loop_follows_speed() {
        let mut audio = AudioManager::new(Recorder::default());
        audio.set_master_volume(1.0);
        let mut car = CarSound {
            speed: 10.0,
            grip: 1.0,
            ..CarSound::default()
        };
        audio.update_loops(Some(&car));
        // Same pitch band: nothing new
        car.speed = 10.5;
        audio.update_loops(Some(&car));
        car.speed = 50.0;
        audio.update_loops(Some(&car));
        assert_eq!(
            audio.trigger().1,
            vec![
                (LoopSound::Engine(6), ENGINE_VOLUME),
                (LoopSound::Engine(6), 0.0),
                (LoopSound::Engine(30), ENGINE_VOLUME),
            ]
        );
    }

    #[test]
    fn test_skid_loop_starts_and_stops() {
        let mut audio = AudioManager::new(Recorder::default());
        audio.set_master_volume(1.0);
        let mut car = CarSound {
            speed: 85.0,
            grip: 0.3,
            steering: true,
            resetting: false,
            curvature: -15.0,
        };
        audio.update_loops(Some(&car));
        assert!(audio.trigger().1.contains(&(LoopSound::Skid, 1.0)));

        car.steering = false;
        audio.update_loops(Some(&car));
        assert_eq!(audio.trigger().1.last(), Some(&(LoopSound::Skid, 0.0)));

        // No player car: everything stops (85 is past the top pitch band)
        audio.update_loops(None);
        assert_eq!(audio.trigger().1.last(), Some(&(LoopSound::Engine(39), 0.0)));
    }

    #[test]
    fn test_volumes_scale_loops() {
        let mut audio = AudioManager::new(Recorder::default());
        audio.set_master_volume(0.5);
        audio.set_sfx_volume(2.0);
        audio.update_loops(Some(&CarSound::default()));
        assert_eq!(audio.trigger().1, vec![(LoopSound::Engine(0), ENGINE_VOLUME * 0.5)]);

        audio.set_muted(true);
        assert_eq!(audio.trigger().1.last(), Some(&(LoopSound::Engine(0), 0.0)));
        audio.update_loops(Some(&CarSound::default()));
        assert_eq!(audio.trigger().1.len(), 2);
    }

    #[test]
    fn test_car_sound_from_state() {
        use crate::settings::RaceSettings;
        use crate::sim::track::Track;

        let settings = RaceSettings {
            num_cars: 1,
            ..RaceSettings::default()
        };
        let state = RaceState::with_track(1, &settings, Track::from_offsets(&[(-7.0, 0.0); 10]), true);
        let input = TickInput {
            steer: 0.5,
            ..TickInput::default()
        };
        let car = CarSound::from_state(&state, &input).unwrap();
        assert_eq!(car.curvature, -7.0);
        assert!(car.steering);
        assert!(!car.resetting);
        assert_eq!(car.grip, 1.0);

        let demo = RaceState::with_track(1, &settings, Track::from_offsets(&[(0.0, 0.0); 10]), false);
        assert_eq!(CarSound::from_state(&demo, &input), None);
    }
}
