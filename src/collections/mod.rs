mod ordered_hashmap;

pub use ordered_hashmap::OrderedHashMap;
