pub mod lti_course_context;
