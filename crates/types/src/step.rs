//! The build step catalog
//!
//! A help-file build walks a fixed, totally ordered set of steps. The
//! catalog is a published, append-only contract: callers persist and
//! display step identifiers, so removing or reordering a step is a
//! breaking change.

use serde::{Deserialize, Serialize};

/// One step of a help-file build.
///
/// The declaration order of the non-terminal variants is the canonical
/// execution order (`Ord` follows it). `None` is the only valid
/// pre-start value; `Completed`, `Canceled`, and `Failed` are the only
/// terminal values and never appear in [`BuildStep::execution_order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStep {
    /// The build has not started yet
    None,
    /// Initial setup: tool lookup, working data preparation
    Initializing,
    /// The working folder is created or cleared
    ClearWorkFolder,
    /// Documentation sources are validated and copied to the build folder
    ValidatingDocumentationSources,
    /// Shared content files are generated
    GenerateSharedContent,
    /// The API filter for the reflection tool is generated
    GenerateApiFilter,
    /// Reflection information is extracted from the documented assemblies
    GenerateReflectionInfo,
    /// Namespace summary information is generated
    GenerateNamespaceSummaries,
    /// Inherited documentation tags are expanded
    GenerateInheritedDocumentation,
    /// The reflection information is transformed for topic generation
    TransformReflectionInfo,
    /// Conceptual content files are copied to the working folders
    CopyConceptualContent,
    /// Conceptual topic configuration files are created
    CreateConceptualTopicConfigs,
    /// Additional content files are copied to the help output folder
    CopyAdditionalContent,
    /// Conceptual and additional-content tables of contents are merged
    MergeTablesOfContents,
    /// The intermediate table of contents is generated
    GenerateIntermediateTableOfContents,
    /// The topic assembler configuration files are created
    CreateBuildAssemblerConfigs,
    /// Custom component configurations are merged into the assembler config
    MergeCustomConfigs,
    /// Conceptual help topics are built
    BuildConceptualTopics,
    /// API reference help topics are built
    BuildReferenceTopics,
    /// Intermediate table-of-contents files are combined into one
    CombiningIntermediateTocFiles,
    /// Title and keyword index information is extracted from the topics
    ExtractingHtmlInfo,
    /// Standard presentation-style content is copied to the output folder
    CopyStandardHelpContent,
    /// The format-specific table of contents is generated
    GenerateHelpFormatTableOfContents,
    /// The help file index is generated
    GenerateHelpFileIndex,
    /// The help project file is generated
    GenerateHelpProject,
    /// The help project is compiled
    CompilingHelpFile,
    /// The full-text search index for website output is generated
    GenerateFullTextIndex,
    /// Website output files are copied to the output path
    CopyingWebsiteFiles,
    /// Temporary build files are removed
    CleanIntermediates,
    /// Terminal: the build completed successfully
    Completed,
    /// Terminal: the build was canceled by request
    Canceled,
    /// Terminal: the build failed
    Failed,
}

/// Canonical execution order of the catalog. Excludes `None` and the
/// terminal outcomes.
const EXECUTION_ORDER: [BuildStep; 28] = [
    BuildStep::Initializing,
    BuildStep::ClearWorkFolder,
    BuildStep::ValidatingDocumentationSources,
    BuildStep::GenerateSharedContent,
    BuildStep::GenerateApiFilter,
    BuildStep::GenerateReflectionInfo,
    BuildStep::GenerateNamespaceSummaries,
    BuildStep::GenerateInheritedDocumentation,
    BuildStep::TransformReflectionInfo,
    BuildStep::CopyConceptualContent,
    BuildStep::CreateConceptualTopicConfigs,
    BuildStep::CopyAdditionalContent,
    BuildStep::MergeTablesOfContents,
    BuildStep::GenerateIntermediateTableOfContents,
    BuildStep::CreateBuildAssemblerConfigs,
    BuildStep::MergeCustomConfigs,
    BuildStep::BuildConceptualTopics,
    BuildStep::BuildReferenceTopics,
    BuildStep::CombiningIntermediateTocFiles,
    BuildStep::ExtractingHtmlInfo,
    BuildStep::CopyStandardHelpContent,
    BuildStep::GenerateHelpFormatTableOfContents,
    BuildStep::GenerateHelpFileIndex,
    BuildStep::GenerateHelpProject,
    BuildStep::CompilingHelpFile,
    BuildStep::GenerateFullTextIndex,
    BuildStep::CopyingWebsiteFiles,
    BuildStep::CleanIntermediates,
];

impl BuildStep {
    /// The ordered catalog of executable steps.
    ///
    /// Never contains `None` or a terminal value. The engine executes
    /// steps in exactly this order; individual steps may be skipped but
    /// never reordered.
    #[must_use]
    pub fn execution_order() -> &'static [BuildStep] {
        &EXECUTION_ORDER
    }

    /// Whether this value ends a run.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Failed)
    }

    /// Whether a skip decision may be applied to this step.
    ///
    /// `Initializing` and `CleanIntermediates` always run: a build must
    /// always set up its working data and always remove its temporary
    /// files. `None` and the terminal values are not executable at all.
    #[must_use]
    pub fn can_skip(self) -> bool {
        !matches!(
            self,
            Self::None
                | Self::Initializing
                | Self::CleanIntermediates
                | Self::Completed
                | Self::Canceled
                | Self::Failed
        )
    }

    /// Stable, human-readable description used for progress display.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::None => "Build not started",
            Self::Initializing => "Initializing to prepare for the build",
            Self::ClearWorkFolder => "Clearing the working folder",
            Self::ValidatingDocumentationSources => "Validating documentation sources",
            Self::GenerateSharedContent => "Generating shared content files",
            Self::GenerateApiFilter => "Generating the API filter",
            Self::GenerateReflectionInfo => "Generating reflection information",
            Self::GenerateNamespaceSummaries => "Generating namespace summaries",
            Self::GenerateInheritedDocumentation => "Expanding inherited documentation",
            Self::TransformReflectionInfo => "Transforming reflection information",
            Self::CopyConceptualContent => "Copying conceptual content files",
            Self::CreateConceptualTopicConfigs => "Creating conceptual topic configurations",
            Self::CopyAdditionalContent => "Copying additional content files",
            Self::MergeTablesOfContents => "Merging tables of contents",
            Self::GenerateIntermediateTableOfContents => {
                "Generating the intermediate table of contents"
            }
            Self::CreateBuildAssemblerConfigs => "Creating topic assembler configurations",
            Self::MergeCustomConfigs => "Merging custom component configurations",
            Self::BuildConceptualTopics => "Building conceptual help topics",
            Self::BuildReferenceTopics => "Building API reference help topics",
            Self::CombiningIntermediateTocFiles => "Combining intermediate TOC files",
            Self::ExtractingHtmlInfo => "Extracting title and keyword index information",
            Self::CopyStandardHelpContent => "Copying standard help content",
            Self::GenerateHelpFormatTableOfContents => {
                "Generating the format-specific table of contents"
            }
            Self::GenerateHelpFileIndex => "Generating the help file index",
            Self::GenerateHelpProject => "Generating the help project file",
            Self::CompilingHelpFile => "Compiling the help file",
            Self::GenerateFullTextIndex => "Generating the full-text search index",
            Self::CopyingWebsiteFiles => "Copying website output files",
            Self::CleanIntermediates => "Removing temporary build files",
            Self::Completed => "Build completed successfully",
            Self::Canceled => "Build canceled by request",
            Self::Failed => "Build failed",
        }
    }

    /// Position of this step in the execution order, if it is part of
    /// the executable catalog.
    #[must_use]
    pub fn position(self) -> Option<usize> {
        EXECUTION_ORDER.iter().position(|s| *s == self)
    }
}

impl std::fmt::Display for BuildStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Recorded outcome of one catalog step within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step's work unit ran and reported success
    Succeeded,
    /// A skip decision applied; the work unit was never invoked
    Skipped,
    /// The step's work unit (or one of its hooks) failed
    Failed,
    /// The step was interrupted by a cooperative cancellation
    Canceled,
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Succeeded => "succeeded",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_order_excludes_sentinels() {
        let order = BuildStep::execution_order();
        assert!(!order.contains(&BuildStep::None));
        assert!(!order.iter().any(|s| s.is_terminal()));
    }

    #[test]
    fn execution_order_matches_declaration_order() {
        let order = BuildStep::execution_order();
        for pair in order.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
        assert_eq!(order.first(), Some(&BuildStep::Initializing));
        assert_eq!(order.last(), Some(&BuildStep::CleanIntermediates));
    }

    #[test]
    fn positions_are_dense() {
        for (idx, step) in BuildStep::execution_order().iter().enumerate() {
            assert_eq!(step.position(), Some(idx));
        }
        assert_eq!(BuildStep::None.position(), None);
        assert_eq!(BuildStep::Failed.position(), None);
    }

    #[test]
    fn setup_and_cleanup_are_not_skippable() {
        assert!(!BuildStep::Initializing.can_skip());
        assert!(!BuildStep::CleanIntermediates.can_skip());
        assert!(BuildStep::GenerateReflectionInfo.can_skip());
        assert!(!BuildStep::Completed.can_skip());
    }

    #[test]
    fn step_serializes_as_snake_case() {
        let json = serde_json::to_string(&BuildStep::GenerateReflectionInfo).unwrap();
        assert_eq!(json, r#""generate_reflection_info""#);
        let back: BuildStep = serde_json::from_str(&json).unwrap();
        assert_eq!(back, BuildStep::GenerateReflectionInfo);
    }

    #[test]
    fn every_step_has_a_description() {
        for step in BuildStep::execution_order() {
            assert!(!step.description().is_empty());
        }
        assert!(!BuildStep::Canceled.description().is_empty());
    }
}
