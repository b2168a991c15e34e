//! Shortest path searches over the street network

pub mod dijkstra;

pub use dijkstra::{
    Direction, SearchParams, ShortestPathTree, bounded_dijkstra,
};
