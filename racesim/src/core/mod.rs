pub mod car;
pub mod driver;
pub mod handle_race;
pub mod oracle;
pub mod physics;
pub mod race;
pub mod replay_race;
pub mod state_handler;
pub mod tireset;
pub mod track;
pub mod weather;
pub mod whatif_race;
