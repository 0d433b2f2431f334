pub mod force_graph;
pub mod whiteboard;
