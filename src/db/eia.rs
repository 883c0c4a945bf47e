pub mod boiler_generator_assn;
