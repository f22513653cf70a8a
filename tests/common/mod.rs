//! Manifest-like schema shared by the integration tests
//!
//! A trimmed-down MPEG-DASH MPD: enough element kinds to exercise names,
//! attributes, character data, embedded records, optional children and
//! namespaced content without declaring the whole vocabulary.

#![allow(dead_code)]

use xmlbind::{xml_schema, Name};

pub const MPD_NAMESPACE: &str = "urn:mpeg:dash:schema:mpd:2011";
pub const CENC_NAMESPACE: &str = "urn:mpeg:cenc:2013";
pub const ON_DEMAND_PROFILE: &str = "urn:mpeg:dash:profile:isoff-on-demand:2011";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mpd {
    pub xml_name: Name,
    pub items: Vec<String>,
    pub program_information: Vec<ProgramInformation>,
    pub base_url: Vec<BaseUrl>,
    pub location: Vec<String>,
    pub period: Vec<Period>,
    pub utc_timing: Vec<Descriptor>,
    pub xmlns: String,
    pub profiles: String,
    pub kind: String,
    pub availability_start_time: String,
    pub media_presentation_duration: String,
    pub min_buffer_time: String,
}

xml_schema!(Mpd {
    xml_name: "MPD",
    items: ",any",
    program_information: "ProgramInformation,omitempty",
    base_url: "BaseURL,omitempty",
    location: "Location,omitempty",
    period: "Period",
    utc_timing: "UTCTiming,omitempty",
    xmlns: "xmlns,attr,omitempty",
    profiles: "profiles,attr",
    kind: "type,attr,omitempty",
    availability_start_time: "availabilityStartTime,attr,omitempty",
    media_presentation_duration: "mediaPresentationDuration,attr,omitempty",
    min_buffer_time: "minBufferTime,attr",
});

impl Mpd {
    /// An empty manifest in the MPD namespace
    pub fn new() -> Self {
        Self {
            xmlns: MPD_NAMESPACE.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramInformation {
    pub title: String,
    pub source: String,
    pub lang: String,
}

xml_schema!(ProgramInformation {
    title: "Title,omitempty",
    source: "Source,omitempty",
    lang: "lang,attr,omitempty",
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseUrl {
    pub value: String,
    pub service_location: String,
    pub availability_time_offset: f64,
}

xml_schema!(BaseUrl {
    value: ",chardata",
    service_location: "serviceLocation,attr,omitempty",
    availability_time_offset: "availabilityTimeOffset,attr,omitempty",
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptor {
    pub items: Vec<String>,
    pub scheme_id_uri: String,
    pub value: String,
}

xml_schema!(Descriptor {
    items: ",any",
    scheme_id_uri: "schemeIdUri,attr,omitempty",
    value: "value,attr,omitempty",
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentProtection {
    pub descriptor: Descriptor,
    pub pssh: Vec<String>,
    pub default_kid: String,
}

xml_schema!(ContentProtection {
    descriptor: embed Descriptor,
    pssh: "urn:mpeg:cenc:2013 cenc:pssh,omitempty",
    default_kid: "urn:mpeg:cenc:2013 cenc:default_KID,attr,omitempty",
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Period {
    pub items: Vec<String>,
    pub base_url: Vec<BaseUrl>,
    pub segment_template: Option<SegmentTemplate>,
    pub adaptation_set: Vec<AdaptationSet>,
    pub id: String,
    pub start: String,
    pub duration: String,
    pub bitstream_switching: bool,
}

xml_schema!(Period {
    items: ",any",
    base_url: "BaseURL,omitempty",
    segment_template: "SegmentTemplate,omitempty",
    adaptation_set: "AdaptationSet,omitempty",
    id: "id,attr,omitempty",
    start: "start,attr,omitempty",
    duration: "duration,attr,omitempty",
    bitstream_switching: "bitstreamSwitching,attr,omitempty",
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepresentationBase {
    pub items: Vec<String>,
    pub content_protection: Vec<ContentProtection>,
    pub essential_property: Vec<Descriptor>,
    pub width: u32,
    pub height: u32,
    pub frame_rate: String,
    pub mime_type: String,
    pub codecs: String,
}

xml_schema!(RepresentationBase {
    items: ",any",
    content_protection: "ContentProtection,omitempty",
    essential_property: "EssentialProperty,omitempty",
    width: "width,attr,omitempty",
    height: "height,attr,omitempty",
    frame_rate: "frameRate,attr,omitempty",
    mime_type: "mimeType,attr,omitempty",
    codecs: "codecs,attr,omitempty",
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdaptationSet {
    pub base: RepresentationBase,
    pub role: Vec<Descriptor>,
    pub segment_template: Option<SegmentTemplate>,
    pub representation: Vec<Representation>,
    pub id: u32,
    pub lang: String,
    pub content_type: String,
    pub segment_alignment: bool,
}

xml_schema!(AdaptationSet {
    base: embed RepresentationBase,
    role: "Role,omitempty",
    segment_template: "SegmentTemplate,omitempty",
    representation: "Representation,omitempty",
    id: "id,attr,omitempty",
    lang: "lang,attr,omitempty",
    content_type: "contentType,attr,omitempty",
    segment_alignment: "segmentAlignment,attr,omitempty",
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Representation {
    pub base: RepresentationBase,
    pub base_url: Vec<BaseUrl>,
    pub segment_template: Option<SegmentTemplate>,
    pub bandwidth: u64,
    pub id: String,
}

xml_schema!(Representation {
    base: embed RepresentationBase,
    base_url: "BaseURL,omitempty",
    segment_template: "SegmentTemplate,omitempty",
    bandwidth: "bandwidth,attr",
    id: "id,attr,omitempty",
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentBase {
    pub items: Vec<String>,
    pub timescale: u32,
    pub presentation_time_offset: u64,
}

xml_schema!(SegmentBase {
    items: ",any",
    timescale: "timescale,attr,omitempty",
    presentation_time_offset: "presentationTimeOffset,attr,omitempty",
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipleSegmentBase {
    pub base: SegmentBase,
    pub segment_timeline: Option<SegmentTimeline>,
    pub duration: u32,
    pub start_number: u32,
}

xml_schema!(MultipleSegmentBase {
    base: embed SegmentBase,
    segment_timeline: "SegmentTimeline,omitempty",
    duration: "duration,attr,omitempty",
    start_number: "startNumber,attr,omitempty",
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentTemplate {
    pub base: MultipleSegmentBase,
    pub media: String,
    pub initialization: String,
}

xml_schema!(SegmentTemplate {
    base: embed MultipleSegmentBase,
    media: "media,attr,omitempty",
    initialization: "initialization,attr,omitempty",
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentTimeline {
    pub s: Vec<S>,
}

xml_schema!(SegmentTimeline {
    s: "S",
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct S {
    pub t: Option<u64>,
    pub d: u64,
    pub r: i64,
}

xml_schema!(S {
    t: "t,attr,omitempty",
    d: "d,attr",
    r: "r,attr,omitempty",
});

/// A single-period on-demand manifest
pub fn on_demand_mpd() -> Mpd {
    Mpd {
        profiles: ON_DEMAND_PROFILE.to_string(),
        kind: "static".to_string(),
        min_buffer_time: "PT2S".to_string(),
        period: vec![Period {
            id: "period-0".to_string(),
            ..Period::default()
        }],
        ..Mpd::new()
    }
}

/// A multi-period live manifest with segment timelines and protection
pub const LIVE_MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" xmlns:cenc="urn:mpeg:cenc:2013" profiles="urn:mpeg:dash:profile:isoff-live:2011" type="dynamic" availabilityStartTime="1970-01-01T00:00:00Z" minBufferTime="PT1.97S">
  <ProgramInformation lang="en">
    <Title>Example &amp; Co</Title>
  </ProgramInformation>
  <BaseURL serviceLocation="cdn-a">https://cdn.example.com/</BaseURL>
  <Period id="0" start="PT0S">
    <AdaptationSet id="1" contentType="video" mimeType="video/mp4" segmentAlignment="true">
      <ContentProtection schemeIdUri="urn:mpeg:dash:mp4protection:2011" value="cenc" cenc:default_KID="10000000-1000-1000-1000-100000000001"/>
      <ContentProtection schemeIdUri="urn:uuid:edef8ba9-79d6-4ace-a3c8-27dcd51d21ed">
        <cenc:pssh>AAAANHBzc2g=</cenc:pssh>
      </ContentProtection>
      <Role schemeIdUri="urn:mpeg:dash:role:2011" value="main"/>
      <SegmentTemplate timescale="30000" media="video_$Number$.mp4" initialization="video_init.mp4" startNumber="1">
        <SegmentTimeline>
          <S t="0" d="60060" r="2"/>
          <S d="30030"/>
        </SegmentTimeline>
      </SegmentTemplate>
      <Representation id="video-1" bandwidth="3000000" width="1280" height="720" codecs="avc1.4d401f"/>
      <Representation id="video-2" bandwidth="6000000" width="1920" height="1080" codecs="avc1.640028"/>
    </AdaptationSet>
  </Period>
  <Period id="1" start="PT60S">
    <Extra>kept</Extra>
  </Period>
  <UTCTiming schemeIdUri="urn:mpeg:dash:utc:http-iso:2014" value="https://time.example.com/"/>
</MPD>
"#;
