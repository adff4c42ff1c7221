pub mod bn_graph;
pub mod bn_learning;
pub mod bn_persistence;
pub mod busy_interval_source;
pub mod case_dispatcher;
pub mod conflict_detector;
pub mod intent_parser;
pub mod schedule_utils;
pub mod slot_suggestion_engine;
pub mod user_bn_service;
