mod advisor;

pub use advisor::SeoAdvisor;
