pub mod cliente;
pub mod enums;
pub mod incidencia;
pub mod orden;
pub mod sucursal;
pub mod user;
pub mod vacaciones;
