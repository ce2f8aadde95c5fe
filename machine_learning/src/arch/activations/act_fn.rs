use super::{Modulus, Relu};

/// The element wise non linearities a graph channel can apply.
#[derive(Clone, Debug)]
pub enum ActFn {
    Relu(Relu),
    Modulus(Modulus),
}

impl ActFn {
    pub fn relu() -> Self {
        Self::Relu(Relu)
    }

    pub fn modulus(order: u32) -> Self {
        Self::Modulus(Modulus::new(order))
    }

    pub fn f(&self, x: f32) -> f32 {
        match self {
            Self::Relu(a) => a.f(x),
            Self::Modulus(a) => a.f(x),
        }
    }

    pub fn df(&self, x: f32) -> f32 {
        match self {
            Self::Relu(a) => a.df(x),
            Self::Modulus(a) => a.df(x),
        }
    }
}
