mod act_fn;
mod modulus;
mod relu;

pub use act_fn::ActFn;
pub use modulus::Modulus;
pub use relu::Relu;
