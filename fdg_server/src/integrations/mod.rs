mod maps;

pub use maps::MapsDistanceResolver;
