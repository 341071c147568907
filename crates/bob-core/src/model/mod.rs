mod legacy;
mod manifest;
mod sequence;

pub use legacy::migrate;
pub use manifest::{BuildUnitSection, DockerOptions, ManifestDocument};
pub use sequence::{
    CommandKind, CommandSequence, DEFAULT_DOCKERFILE, ENGINE_PROGRAM, EngineCommand,
    IMAGE_PLACEHOLDER, InstructionSet, SubSequence, SubSequenceMetadata,
};
