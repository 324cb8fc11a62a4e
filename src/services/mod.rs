pub mod countdown;
pub mod jolpica;
pub mod openmeteo;
pub mod results;
pub mod weather;
