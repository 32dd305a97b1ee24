//! Well-known document properties from the summary information streams.

use chrono::{DateTime, Utc};

use super::filesystem::{CompoundFile, DirectoryNode, FilesystemError};
use super::property::{
    DOCUMENT_SUMMARY_INFORMATION_ID, DOCUMENT_SUMMARY_INFORMATION_NAME, Filetime, PropertyError,
    PropertyResult, PropertySet, SUMMARY_INFORMATION_ID, SUMMARY_INFORMATION_NAME, Section,
    Variant,
};
use crate::common::DecodeOptions;

// SummaryInformation property IDs
const PID_TITLE: u32 = 2;
const PID_SUBJECT: u32 = 3;
const PID_AUTHOR: u32 = 4;
const PID_KEYWORDS: u32 = 5;
const PID_COMMENTS: u32 = 6;
const PID_TEMPLATE: u32 = 7;
const PID_LAST_AUTHOR: u32 = 8;
const PID_REVNUMBER: u32 = 9;
const PID_LASTPRINTED: u32 = 11;
const PID_CREATE_DTM: u32 = 12;
const PID_LASTSAVE_DTM: u32 = 13;
const PID_PAGECOUNT: u32 = 14;
const PID_WORDCOUNT: u32 = 15;
const PID_CHARCOUNT: u32 = 16;
const PID_APPNAME: u32 = 18;
const PID_SECURITY: u32 = 19;

// DocumentSummaryInformation property IDs
const PID_CATEGORY: u32 = 2;
const PID_MANAGER: u32 = 14;
const PID_COMPANY: u32 = 15;

/// Standard properties of a compound document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    pub codepage: Option<u16>,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub keywords: Option<String>,
    pub comments: Option<String>,
    pub template: Option<String>,
    pub last_author: Option<String>,
    pub revision_number: Option<String>,
    pub last_printed: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub last_saved: Option<DateTime<Utc>>,
    pub page_count: Option<i32>,
    pub word_count: Option<i32>,
    pub char_count: Option<i32>,
    pub application: Option<String>,
    pub security: Option<i32>,

    pub category: Option<String>,
    pub manager: Option<String>,
    pub company: Option<String>,
}

impl DocumentMetadata {
    /// Read both summary streams from the root of `cf`. Missing streams
    /// leave their fields empty.
    pub fn from_compound_file(
        cf: &CompoundFile,
        options: &DecodeOptions,
    ) -> PropertyResult<Self> {
        let mut metadata = Self::default();
        if let Some(set) = read_set(cf.root(), SUMMARY_INFORMATION_NAME, options)?
            && let Some(section) = set.first_section()
        {
            metadata.apply_summary(section);
        }
        if let Some(set) = read_set(cf.root(), DOCUMENT_SUMMARY_INFORMATION_NAME, options)?
            && let Some(section) = set.first_section()
        {
            metadata.apply_document_summary(section);
        }
        Ok(metadata)
    }

    pub fn from_summary_information(set: &PropertySet) -> Self {
        let mut metadata = Self::default();
        if let Some(section) = set.first_section() {
            metadata.apply_summary(section);
        }
        metadata
    }

    fn apply_summary(&mut self, section: &Section) {
        self.codepage = section.property(super::property::PID_CODEPAGE).map(|_| section.codepage());
        self.title = section.string(PID_TITLE);
        self.subject = section.string(PID_SUBJECT);
        self.author = section.string(PID_AUTHOR);
        self.keywords = section.string(PID_KEYWORDS);
        self.comments = section.string(PID_COMMENTS);
        self.template = section.string(PID_TEMPLATE);
        self.last_author = section.string(PID_LAST_AUTHOR);
        self.revision_number = section.string(PID_REVNUMBER);
        self.last_printed = time(section, PID_LASTPRINTED);
        self.created = time(section, PID_CREATE_DTM);
        self.last_saved = time(section, PID_LASTSAVE_DTM);
        self.page_count = int(section, PID_PAGECOUNT);
        self.word_count = int(section, PID_WORDCOUNT);
        self.char_count = int(section, PID_CHARCOUNT);
        self.application = section.string(PID_APPNAME);
        self.security = int(section, PID_SECURITY);
    }

    fn apply_document_summary(&mut self, section: &Section) {
        self.category = section.string(PID_CATEGORY);
        self.manager = section.string(PID_MANAGER);
        self.company = section.string(PID_COMPANY);
    }

    /// Build the `SummaryInformation` property set.
    pub fn to_summary_information(&self) -> PropertySet {
        let mut set = PropertySet::with_section(SUMMARY_INFORMATION_ID);
        if let Some(section) = set.first_section_mut() {
            section.set_codepage(self.codepage.unwrap_or(crate::ole::codepage::CP_WINDOWS_1252));
            let strings = [
                (PID_TITLE, &self.title),
                (PID_SUBJECT, &self.subject),
                (PID_AUTHOR, &self.author),
                (PID_KEYWORDS, &self.keywords),
                (PID_COMMENTS, &self.comments),
                (PID_TEMPLATE, &self.template),
                (PID_LAST_AUTHOR, &self.last_author),
                (PID_REVNUMBER, &self.revision_number),
                (PID_APPNAME, &self.application),
            ];
            for (id, value) in strings {
                if let Some(text) = value {
                    section.set_string(id, text);
                }
            }
            let times = [
                (PID_LASTPRINTED, self.last_printed),
                (PID_CREATE_DTM, self.created),
                (PID_LASTSAVE_DTM, self.last_saved),
            ];
            for (id, value) in times {
                if let Some(time) = value {
                    section.set_property(id, Variant::Filetime(Filetime::from_datetime(time)));
                }
            }
            let ints = [
                (PID_PAGECOUNT, self.page_count),
                (PID_WORDCOUNT, self.word_count),
                (PID_CHARCOUNT, self.char_count),
                (PID_SECURITY, self.security),
            ];
            for (id, value) in ints {
                if let Some(n) = value {
                    section.set_property(id, Variant::I4(n));
                }
            }
        }
        set
    }

    /// Build the `DocumentSummaryInformation` property set.
    pub fn to_document_summary_information(&self) -> PropertySet {
        let mut set = PropertySet::with_section(DOCUMENT_SUMMARY_INFORMATION_ID);
        if let Some(section) = set.first_section_mut() {
            section.set_codepage(self.codepage.unwrap_or(crate::ole::codepage::CP_WINDOWS_1252));
            let strings = [
                (PID_CATEGORY, &self.category),
                (PID_MANAGER, &self.manager),
                (PID_COMPANY, &self.company),
            ];
            for (id, value) in strings {
                if let Some(text) = value {
                    section.set_string(id, text);
                }
            }
        }
        set
    }

    /// Replace both summary streams at the root of `cf`.
    pub fn write_to(&self, cf: &mut CompoundFile) -> crate::common::Result<()> {
        let summary = self.to_summary_information().to_bytes()?;
        let document = self.to_document_summary_information().to_bytes()?;
        let root = cf.root_mut();
        for (name, bytes) in [
            (SUMMARY_INFORMATION_NAME, summary),
            (DOCUMENT_SUMMARY_INFORMATION_NAME, document),
        ] {
            if root.has_entry(name) {
                root.delete_entry(name)?;
            }
            root.create_document(name, bytes)?;
        }
        Ok(())
    }
}

fn read_set(
    root: &DirectoryNode,
    name: &str,
    options: &DecodeOptions,
) -> PropertyResult<Option<PropertySet>> {
    let data = match root.document(name) {
        Ok(data) => data,
        Err(FilesystemError::NotFound { .. }) => return Ok(None),
        Err(err) => {
            return Err(PropertyError::InvalidPropertySet(err.to_string()));
        },
    };
    PropertySet::read(data, options).map(Some)
}

fn time(section: &Section, id: u32) -> Option<DateTime<Utc>> {
    match section.property(id)?.value() {
        Variant::Filetime(ft) => ft.to_datetime(),
        _ => None,
    }
}

fn int(section: &Section, id: u32) -> Option<i32> {
    section
        .property(id)?
        .value()
        .as_i64()
        .and_then(|n| i32::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_metadata_round_trip_through_compound_file() {
        let metadata = DocumentMetadata {
            title: Some("Budget".to_string()),
            author: Some("Finance".to_string()),
            created: Some(Utc.with_ymd_and_hms(2020, 5, 17, 8, 30, 0).unwrap()),
            page_count: Some(3),
            company: Some("Example Ltd".to_string()),
            ..Default::default()
        };
        let mut cf = CompoundFile::new();
        metadata.write_to(&mut cf).unwrap();
        let cf = CompoundFile::open(&cf.to_bytes().unwrap()).unwrap();

        let read = DocumentMetadata::from_compound_file(&cf, &DecodeOptions::new()).unwrap();
        assert_eq!(read.title.as_deref(), Some("Budget"));
        assert_eq!(read.author.as_deref(), Some("Finance"));
        assert_eq!(read.created, metadata.created);
        assert_eq!(read.page_count, Some(3));
        assert_eq!(read.company.as_deref(), Some("Example Ltd"));
        assert_eq!(read.codepage, Some(1252));
    }

    #[test]
    fn test_missing_streams_give_empty_metadata() {
        let read =
            DocumentMetadata::from_compound_file(&CompoundFile::new(), &DecodeOptions::new())
                .unwrap();
        assert_eq!(read, DocumentMetadata::default());
    }
}
