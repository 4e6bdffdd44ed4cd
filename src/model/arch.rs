use crate::config::AnnotationLevel;

/// One layer of the classifier topology
///
/// The topology is fixed and externally validated; this description exists
/// so training tooling can materialize it and so the level-specific heads
/// stay in one place.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Conv2d {
        name: &'static str,
        filters: usize,
        kernel: usize,
        activation: Activation,
    },
    MaxPool2d {
        name: &'static str,
        pool: usize,
    },
    Flatten {
        name: &'static str,
    },
    Dense {
        name: &'static str,
        units: usize,
        activation: Activation,
    },
    Dropout {
        name: &'static str,
        rate: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Softmax,
    Sigmoid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    CategoricalCrossentropy,
    BinaryCrossentropy,
}

/// Output layer for one annotation level
#[derive(Debug, Clone, PartialEq)]
pub struct OutputHead {
    pub name: &'static str,
    pub units: usize,
    pub activation: Activation,
    pub loss: Loss,
}

/// Shared convolutional/pooling backbone with the hidden dense layers
///
/// The output layer is left out and supplied per annotation level.
fn core_layers() -> Vec<Layer> {
    use Activation::Relu;
    use Layer::*;

    vec![
        Conv2d { name: "C11", filters: 32, kernel: 3, activation: Relu },
        Conv2d { name: "C12", filters: 32, kernel: 3, activation: Relu },
        Conv2d { name: "C13", filters: 32, kernel: 3, activation: Relu },
        MaxPool2d { name: "M1", pool: 2 },
        Conv2d { name: "C21", filters: 64, kernel: 3, activation: Relu },
        Conv2d { name: "C22", filters: 64, kernel: 3, activation: Relu },
        MaxPool2d { name: "M2", pool: 2 },
        Conv2d { name: "C31", filters: 128, kernel: 3, activation: Relu },
        Conv2d { name: "C32", filters: 128, kernel: 3, activation: Relu },
        MaxPool2d { name: "M3", pool: 2 },
        Conv2d { name: "C4", filters: 128, kernel: 3, activation: Relu },
        MaxPool2d { name: "M4", pool: 2 },
        Flatten { name: "F" },
        Dense { name: "FC1", units: 64, activation: Relu },
        Dropout { name: "D1", rate: 0.3 },
        Dense { name: "FC2", units: 16, activation: Relu },
        Dropout { name: "D2", rate: 0.2 },
    ]
}

/// An untrained classifier for one annotation level
///
/// Holds the full topology (backbone plus level head) but no weights, so it
/// cannot predict; it is the starting point for a training run.
#[derive(Debug, Clone)]
pub struct FreshModel {
    level: AnnotationLevel,
    layers: Vec<Layer>,
    head: OutputHead,
}

impl FreshModel {
    pub fn for_level(level: AnnotationLevel) -> Self {
        let head = match level {
            // Three mutually exclusive categories, so softmax activation
            // with categorical cross-entropy.
            AnnotationLevel::RootSegm => OutputHead {
                name: "RS",
                units: 3,
                activation: Activation::Softmax,
                loss: Loss::CategoricalCrossentropy,
            },
            // Four independently assessed categories, so per-class sigmoid
            // outputs with binary cross-entropy.
            AnnotationLevel::IRStruct => OutputHead {
                name: "IS",
                units: 4,
                activation: Activation::Sigmoid,
                loss: Loss::BinaryCrossentropy,
            },
        };

        Self {
            level,
            layers: core_layers(),
            head,
        }
    }

    pub fn level(&self) -> AnnotationLevel {
        self.level
    }

    /// Input tiles have red, green, and blue channels
    pub fn input_shape(&self) -> (u32, u32, u32) {
        let edge = self.level.tile_edge();
        (edge, edge, 3)
    }

    pub fn class_count(&self) -> usize {
        self.head.units
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn head(&self) -> &OutputHead {
        &self.head
    }
}
