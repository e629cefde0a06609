use crate::metadata::{keys, MetadataRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    CameraSettings,
    ImageInformation,
    Location,
}

impl Section {
    const ALL: [Section; 3] = [
        Section::CameraSettings,
        Section::ImageInformation,
        Section::Location,
    ];

    fn title(self) -> &'static str {
        match self {
            Section::CameraSettings => "Camera Settings",
            Section::ImageInformation => "Image Information",
            Section::Location => "Location",
        }
    }
}

/// One prompt line: rendered only when every key is present. `{0}`, `{1}`
/// in the template are replaced by the values of `keys` in order.
struct PromptLine {
    section: Section,
    label: &'static str,
    keys: &'static [&'static str],
    template: &'static str,
}

const PROMPT_LINES: &[PromptLine] = &[
    PromptLine {
        section: Section::CameraSettings,
        label: "Camera Make",
        keys: &[keys::MAKE],
        template: "{0}",
    },
    PromptLine {
        section: Section::CameraSettings,
        label: "Camera Model",
        keys: &[keys::MODEL],
        template: "{0}",
    },
    PromptLine {
        section: Section::CameraSettings,
        label: "Exposure Time",
        keys: &[keys::EXPOSURE_TIME],
        template: "{0}s",
    },
    PromptLine {
        section: Section::CameraSettings,
        label: "Aperture",
        keys: &[keys::F_NUMBER],
        template: "f/{0}",
    },
    PromptLine {
        section: Section::CameraSettings,
        label: "ISO",
        keys: &[keys::ISO],
        template: "{0}",
    },
    PromptLine {
        section: Section::CameraSettings,
        label: "Focal Length",
        keys: &[keys::FOCAL_LENGTH],
        template: "{0}mm",
    },
    PromptLine {
        section: Section::ImageInformation,
        label: "Dimensions",
        keys: &[keys::WIDTH, keys::HEIGHT],
        template: "{0} x {1} pixels",
    },
    PromptLine {
        section: Section::ImageInformation,
        label: "Aspect Ratio",
        keys: &[keys::ASPECT_RATIO],
        template: "{0}",
    },
    PromptLine {
        section: Section::ImageInformation,
        label: "Date Taken",
        keys: &[keys::DATE_TAKEN],
        template: "{0}",
    },
    PromptLine {
        section: Section::ImageInformation,
        label: "File Type",
        keys: &[keys::MIME_TYPE],
        template: "{0}",
    },
    PromptLine {
        section: Section::ImageInformation,
        label: "File Size",
        keys: &[keys::FILE_SIZE],
        template: "{0}",
    },
    PromptLine {
        section: Section::Location,
        label: "Place",
        keys: &[keys::LOCATION_NAME],
        template: "{0}",
    },
    PromptLine {
        section: Section::Location,
        label: "Coordinates",
        keys: &[keys::LATITUDE, keys::LONGITUDE],
        template: "{0}, {1}",
    },
    PromptLine {
        section: Section::Location,
        label: "Altitude",
        keys: &[keys::ALTITUDE],
        template: "{0}m",
    },
];

impl PromptLine {
    fn render(&self, record: &MetadataRecord) -> Option<String> {
        let mut value = self.template.to_string();
        for (i, key) in self.keys.iter().enumerate() {
            let field = record.get(key)?;
            value = value.replace(&format!("{{{}}}", i), &field.to_string());
        }
        Some(format!("{}: {}", self.label, value))
    }
}

const ROLE_PREAMBLE: &str = "You are an expert photographer, photo editor and social media strategist. \
Analyze the attached image carefully and provide an engaging description, discoverable tags \
and practical suggestions for improving the photo.";

const NO_METADATA: &str = "No metadata is available for this image.";

const OUTPUT_CONTRACT: &str = r##"Provide:
1. A description of the image in 3-4 sentences.
2. 5-7 relevant tags (single words or short phrases suitable for social media).
3. 5-7 hashtags, each starting with "#".
4. 3-5 enhancement suggestions, each with a short title, a one to two sentence description and a priority of "high", "medium" or "low".

Format your entire response as a single JSON object with exactly this shape:
{
  "description": "string",
  "tags": ["string"],
  "hashtags": ["#string"],
  "enhancementSuggestions": [
    { "title": "string", "description": "string", "priority": "high" | "medium" | "low" }
  ]
}"##;

/// Renders the metadata record as labeled sections. Sections without any
/// present field are left out; `None` when nothing renders at all.
pub fn format_metadata_block(record: &MetadataRecord) -> Option<String> {
    let sections: Vec<String> = Section::ALL
        .iter()
        .filter_map(|section| {
            let lines: Vec<String> = PROMPT_LINES
                .iter()
                .filter(|line| line.section == *section)
                .filter_map(|line| line.render(record))
                .collect();
            if lines.is_empty() {
                None
            } else {
                Some(format!("{}:\n{}", section.title(), lines.join("\n")))
            }
        })
        .collect();

    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n\n"))
    }
}

/// Composes the full analysis instruction.
pub fn build_prompt(context: Option<&str>, metadata: Option<&MetadataRecord>) -> String {
    let mut prompt = String::from(ROLE_PREAMBLE);

    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str(
            "\n\nThe user provided the following context about this image. \
Give it significant weight in your description, tags and suggestions:\n",
        );
        prompt.push_str(context);
    }

    prompt.push_str("\n\n");
    match metadata.and_then(format_metadata_block) {
        Some(block) => {
            prompt.push_str("Image metadata:\n");
            prompt.push_str(&block);
        }
        None => prompt.push_str(NO_METADATA),
    }

    prompt.push_str("\n\n");
    prompt.push_str(OUTPUT_CONTRACT);
    prompt
}
