pub mod demo_race;
pub mod read_sim_pars;
pub mod sim_opts;
