//! Sample records the console starts with.

use super::records::{Avatar, Observer, Scenario};

pub fn sample_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            id: "1".into(),
            name: "Digital Service Assistance".into(),
            description: "Help an elderly citizen navigate online form submission and digital identity verification.".into(),
            category: "Document Processing".into(),
            difficulty: 4,
            duration: 20,
            scene: "Information Desk".into(),
            background_noise: true,
            success_criteria: "Clear Communication and Proper Procedure Following".into(),
            keywords: "digital services, online forms, identity verification, patience, step-by-step guidance".into(),
        },
        Scenario {
            id: "2".into(),
            name: "Language Barrier Resolution".into(),
            description: "Assist a non-native speaker with completing essential service applications while maintaining clear communication.".into(),
            category: "Special Needs Assistance".into(),
            difficulty: 3,
            duration: 25,
            scene: "Private Consultation Room".into(),
            background_noise: false,
            success_criteria: "Effective Communication and Accurate Information Provided".into(),
            keywords: "translation, clear speech, visual aids, documentation requirements, verification".into(),
        },
        Scenario {
            id: "3".into(),
            name: "Emergency Service Request".into(),
            description: "Handle an urgent situation with a distressed citizen requiring immediate assistance with social services.".into(),
            category: "Emergency Assistance".into(),
            difficulty: 5,
            duration: 15,
            scene: "Quick Service Counter".into(),
            background_noise: true,
            success_criteria: "Effective Conflict Resolution and Appropriate Referral Made".into(),
            keywords: "urgency, empathy, crisis management, service coordination, immediate response".into(),
        },
    ]
}

pub fn sample_avatars() -> Vec<Avatar> {
    vec![
        Avatar {
            id: "1".into(),
            name: "Sales Manager".into(),
            description: "A challenging sales manager who will test your negotiation skills.".into(),
            personality_type: "Challenging".into(),
            communication_style: "Direct".into(),
            knowledge_level: 8,
            aggressiveness_level: 7,
            patience_level: 4,
            emotional_reactivity: 6,
            voice_type: "Deep".into(),
            speaking_speed: 3,
            image_url: String::new(),
            keywords: "negotiation, sales targets, performance, objections".into(),
        },
        Avatar {
            id: "2".into(),
            name: "Customer Support".into(),
            description: "A patient customer support representative for practicing service scenarios.".into(),
            personality_type: "Supportive".into(),
            communication_style: "Empathetic".into(),
            knowledge_level: 6,
            aggressiveness_level: 2,
            patience_level: 9,
            emotional_reactivity: 4,
            voice_type: "Natural".into(),
            speaking_speed: 3,
            image_url: String::new(),
            keywords: "service, resolution, listening, empathy".into(),
        },
    ]
}

pub fn sample_observers() -> Vec<Observer> {
    vec![
        Observer {
            id: "1".into(),
            name: "Sales Coach".into(),
            description: "An observer focused on sales performance metrics and techniques.".into(),
            feedback_style: "Instructional".into(),
            intervention_level: 3,
            detail_level: 4,
            feedback_tone: "Encouraging".into(),
            success_metrics: "Successfully address customer objections, present value proposition, and close sale within target time.".into(),
            intervention_triggers: vec![
                "Missed opportunity".into(),
                "Incorrect information shared".into(),
                "Success criteria met".into(),
                "Extended silence".into(),
            ],
            active: true,
        },
        Observer {
            id: "2".into(),
            name: "Conflict Mediator".into(),
            description: "Evaluates conflict resolution skills and provides guidance on de-escalation techniques.".into(),
            feedback_style: "Socratic".into(),
            intervention_level: 2,
            detail_level: 5,
            feedback_tone: "Neutral".into(),
            success_metrics: "Successful de-escalation, finding common ground, maintaining professional demeanor throughout conflict.".into(),
            intervention_triggers: vec![
                "Inappropriate communication".into(),
                "Customer frustration detected".into(),
                "Talking over the customer".into(),
            ],
            active: true,
        },
    ]
}
