pub mod io;
pub mod modality;
pub mod psi;
