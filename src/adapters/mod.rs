pub mod csv_observation_adapter;
pub mod exchange_adapter;
pub mod file_config_adapter;
pub mod jsonl_round_adapter;
